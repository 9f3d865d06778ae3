//! Tuning knobs for [`FieldUpdater`](crate::FieldUpdater).

/// # Examples
///
/// ```rust
/// use atomic_field_update::{FieldUpdater, NoBarrier, UpdaterConfig};
///
/// // Trap on bad indices instead of returning an error.
/// let config = UpdaterConfig {
///     bounds_check: false,
///     ..Default::default()
/// };
/// let updater = FieldUpdater::with_config(NoBarrier, config);
/// assert!(!updater.config().bounds_check);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// Report `FieldError::IndexOutOfRange` for a bad index.
    ///
    /// When disabled an out-of-range index panics instead.  Neither setting
    /// ever writes outside the object.
    ///
    /// Default: true
    pub bounds_check: bool,

    /// Number of failed compare-and-swap attempts inside one retry-loop
    /// operation (`update_field`, `fetch_and_add_field`) after which a warning
    /// is logged.  Zero disables the warning.
    ///
    /// Default: 1024
    pub contention_warn_threshold: u32,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            bounds_check: true,
            contention_warn_threshold: 1024,
        }
    }
}
