use anyhow::{Result, bail};

use crate::storage::KeyValueStore;

pub const THEME_KEY: &str = "alarm-theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub preview: ThemePreview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemePreview {
    pub primary: &'static str,
    pub accent: &'static str,
    pub background: &'static str,
}

pub const THEMES: [Theme; 4] = [
    Theme {
        key: "dark",
        name: "Classic Dark",
        description: "Modern dark theme with light blue",
        preview: ThemePreview {
            primary: "#60A5FA",
            accent: "#FBBF24",
            background: "#1E293B",
        },
    },
    Theme {
        key: "theme-ocean",
        name: "Blue Ocean",
        description: "Inspired by the depths of the ocean",
        preview: ThemePreview {
            primary: "#3B82F6",
            accent: "#06B6D4",
            background: "#0F172A",
        },
    },
    Theme {
        key: "theme-sunset",
        name: "Golden Sunset",
        description: "The warmth of the setting sun",
        preview: ThemePreview {
            primary: "#F97316",
            accent: "#EC4899",
            background: "#1C1917",
        },
    },
    Theme {
        key: "theme-forest",
        name: "Green Forest",
        description: "The calm of green nature",
        preview: ThemePreview {
            primary: "#10B981",
            accent: "#84CC16",
            background: "#1F2937",
        },
    },
];

pub fn theme(key: &str) -> Option<&'static Theme> {
    THEMES.iter().find(|theme| theme.key == key)
}

/// Stored selection, falling back to the default when the stored key is
/// missing or no longer names a theme.
pub fn active_theme(storage: &KeyValueStore) -> &'static Theme {
    // The default theme is the first table entry.
    let fallback = &THEMES[0];
    match storage.get::<String>(THEME_KEY) {
        Some(key) => match theme(&key) {
            Some(found) => found,
            None => {
                log::warn!("stored theme is unknown, using default. [key = {key}]");
                fallback
            }
        },
        None => fallback,
    }
}

pub fn set_theme(storage: &KeyValueStore, key: &str) -> Result<&'static Theme> {
    let Some(selected) = theme(key) else {
        bail!("unknown theme '{key}'");
    };
    storage.set(THEME_KEY, &key.to_string())?;
    Ok(selected)
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn defaults_to_dark_when_nothing_is_stored() {
        let dir = tempdir().expect("tempdir");
        let storage = KeyValueStore::open(dir.path()).expect("open");
        assert_eq!(active_theme(&storage).key, "dark");
    }

    #[test]
    fn selection_round_trips() {
        let dir = tempdir().expect("tempdir");
        let storage = KeyValueStore::open(dir.path()).expect("open");
        set_theme(&storage, "theme-ocean").expect("set");
        assert_eq!(active_theme(&storage).key, "theme-ocean");
        assert_eq!(active_theme(&storage).name, "Blue Ocean");
    }

    #[test]
    fn unknown_key_is_rejected_and_selection_unchanged() {
        let dir = tempdir().expect("tempdir");
        let storage = KeyValueStore::open(dir.path()).expect("open");
        set_theme(&storage, "theme-sunset").expect("set");
        let err = set_theme(&storage, "theme-neon").expect_err("unknown theme");
        assert!(err.to_string().contains("unknown theme"));
        assert_eq!(active_theme(&storage).key, "theme-sunset");
    }

    #[test]
    fn stale_stored_key_falls_back_to_default() {
        let dir = tempdir().expect("tempdir");
        let storage = KeyValueStore::open(dir.path()).expect("open");
        storage
            .set(THEME_KEY, &"theme-removed".to_string())
            .expect("set");
        assert_eq!(active_theme(&storage).key, "dark");
    }
}
