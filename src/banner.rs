// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    let banner = r#"
                     _
  __ _ _ __ __ _  __| | ___ _ __
 / _` | '__/ _` |/ _` |/ _ \ '__|
| (_| | | | (_| | (_| |  __/ |
 \__, |_|  \__,_|\__,_|\___|_|
 |___/

    Chatbot Evaluation Console
"#;
    println!("{}", banner);
}
