pub const DEFAULT_ROUTE_COUNT: u32 = 15_000;
pub const DEFAULT_INTERFACE: &str = "lo";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    /// Number of host routes to insert before measuring.
    pub routes: u32,
    /// Egress interface for every inserted route.
    pub interface: String,
    /// Table for inserted routes; `None` uses the kernel default.
    pub table: Option<u32>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            routes: DEFAULT_ROUTE_COUNT,
            interface: DEFAULT_INTERFACE.to_string(),
            table: None,
        }
    }
}
