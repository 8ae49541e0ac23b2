pub const CONTROL: &str = "/api/control";
pub const STATUS: &str = "/api/status";

pub fn ingest(filename: &str) -> String {
    format!("/api/ingest/{}", filename)
}
