/// Configuration for a command [`Session`](crate::command::Session).
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial capacity hint for the number of entries.
    pub initial_capacity: usize,
    /// ASCII-lowercase every word before it reaches the dictionary.
    pub fold_case: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
            fold_case: true,
        }
    }
}
