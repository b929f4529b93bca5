//! Format-version (`DataVersion`) thresholds.
//!
//! Statistics files carry the game's data version. The highest version seen
//! during a reload decides which tools exist and how the generated datapack
//! is laid out.

/// Last data version without netherite tools.
pub const NETHERITE_AFTER: u32 = 2504;
/// Last data version using the plural `functions` datapack folder.
pub const FUNCTION_FOLDER_AFTER: u32 = 3953;
/// Last data version without copper tools.
pub const COPPER_AFTER: u32 = 4534;

/// The detected format version, if any file reported one.
///
/// # Examples
///
/// ```rust
/// use scorecraft::FormatVersion;
///
/// let mut version = FormatVersion::unknown();
/// assert!(version.has_netherite());
/// assert!(!version.has_copper());
///
/// version.observe(2230);
/// version.observe(1976);
/// assert_eq!(version.get(), Some(2230));
/// assert!(!version.has_netherite());
/// assert_eq!(version.function_folder(), "functions");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FormatVersion(Option<u32>);

impl FormatVersion {
    /// No version observed yet.
    pub fn unknown() -> Self {
        Self(None)
    }

    /// A known version.
    pub fn new(version: u32) -> Self {
        Self(Some(version))
    }

    pub fn get(self) -> Option<u32> {
        self.0
    }

    /// Record a version; only a higher version replaces the current one.
    ///
    /// Returns `true` when the detected version changed.
    pub fn observe(&mut self, version: u32) -> bool {
        match self.0 {
            Some(current) if current >= version => false,
            _ => {
                self.0 = Some(version);
                true
            }
        }
    }

    /// Netherite tools exist (assumed when unknown).
    pub fn has_netherite(self) -> bool {
        self.0.map_or(true, |v| v > NETHERITE_AFTER)
    }

    /// Copper tools exist (assumed absent when unknown).
    pub fn has_copper(self) -> bool {
        self.0.map_or(false, |v| v > COPPER_AFTER)
    }

    /// Datapack folder holding functions and function tags.
    pub fn function_folder(self) -> &'static str {
        match self.0 {
            Some(v) if v <= FUNCTION_FOLDER_AFTER => "functions",
            _ => "function",
        }
    }
}
