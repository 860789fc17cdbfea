//! Mapping between abstract `Visibility` and Unix permission bits.

use stowage_core::Visibility;

pub trait VisibilityConverter: Send + Sync {
    fn for_file(&self, visibility: Visibility) -> u32;

    fn for_directory(&self, visibility: Visibility) -> u32;

    /// Exact match against the configured file modes; anything else is public.
    fn inverse_for_file(&self, mode: u32) -> Visibility;

    /// Exact match against the configured directory modes; anything else is public.
    fn inverse_for_directory(&self, mode: u32) -> Visibility;
}

/// Permission set used for one kind of entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModePair {
    pub public: u32,
    pub private: u32,
}

impl ModePair {
    fn mode(&self, visibility: Visibility) -> u32 {
        match visibility {
            Visibility::Public => self.public,
            Visibility::Private => self.private,
        }
    }

    fn inverse(&self, mode: u32) -> Visibility {
        if mode == self.private {
            Visibility::Private
        } else {
            Visibility::Public
        }
    }
}

pub const DEFAULT_FILE_MODES: ModePair = ModePair {
    public: 0o644,
    private: 0o600,
};

pub const DEFAULT_DIRECTORY_MODES: ModePair = ModePair {
    public: 0o755,
    private: 0o700,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortableVisibilityConverter {
    file: ModePair,
    directory: ModePair,
}

impl Default for PortableVisibilityConverter {
    fn default() -> Self {
        Self {
            file: DEFAULT_FILE_MODES,
            directory: DEFAULT_DIRECTORY_MODES,
        }
    }
}

impl PortableVisibilityConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_permissions(file: ModePair, directory: ModePair) -> Self {
        Self { file, directory }
    }
}

impl VisibilityConverter for PortableVisibilityConverter {
    fn for_file(&self, visibility: Visibility) -> u32 {
        self.file.mode(visibility)
    }

    fn for_directory(&self, visibility: Visibility) -> u32 {
        self.directory.mode(visibility)
    }

    fn inverse_for_file(&self, mode: u32) -> Visibility {
        self.file.inverse(mode)
    }

    fn inverse_for_directory(&self, mode: u32) -> Visibility {
        self.directory.inverse(mode)
    }
}
