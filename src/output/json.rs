use crate::types::Report;
use serde::Serialize;

#[derive(Serialize)]
struct Output<'a> {
    version: &'static str,
    path: &'a str,
    #[serde(flatten)]
    report: &'a Report,
}

pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    pub fn format(&self, path: &str, report: &Report) -> String {
        let output = Output { version: env!("CARGO_PKG_VERSION"), path, report };

        if self.pretty {
            serde_json::to_string_pretty(&output)
                .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        } else {
            serde_json::to_string(&output).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
        }
    }
}
