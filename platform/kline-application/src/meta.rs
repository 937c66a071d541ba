pub const ENGINE_NAME: &str = "kline";
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn engine_label() -> String {
    format!("{ENGINE_NAME} {ENGINE_VERSION}")
}
