use std::fmt::{self, Display, Formatter};

/// A single-entry `grub.cfg` booting the staged kernel via Multiboot.
#[derive(Debug, Clone)]
pub struct GrubConfig<'a> {
    pub default_entry: u32,
    pub timeout: u32,
    pub title: &'a str,
    /// Kernel path as seen by GRUB, rooted at the disc.
    pub kernel_path: &'a str,
}

impl GrubConfig<'_> {
    #[must_use]
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl Display for GrubConfig<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(f, "set default={}", self.default_entry)?;
        writeln!(f, "set timeout={}", self.timeout)?;
        writeln!(f)?;
        writeln!(f, "menuentry \"{}\" {{", self.title.replace('"', "\\\""))?;
        writeln!(f, "    multiboot {}", self.kernel_path)?;
        writeln!(f, "    boot")?;
        writeln!(f, "}}")
    }
}
