/// Limits applied when loading schema definition files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadLimits {
    /// Maximum bytes allowed per schema definition file.
    pub max_file_size: usize,
}

impl Default for LoadLimits {
    fn default() -> Self {
        Self {
            max_file_size: 64 * 1024,
        }
    }
}
