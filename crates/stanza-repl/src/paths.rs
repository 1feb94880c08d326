//! XDG Base Directory paths for stanza.
//!
//! | Purpose  | XDG Variable       | Default          | stanza Path                              |
//! |----------|--------------------|------------------|------------------------------------------|
//! | Config   | `$XDG_CONFIG_HOME` | `~/.config`      | `$XDG_CONFIG_HOME/stanza/config.toml`    |
//! | Registry | `$XDG_CONFIG_HOME` | `~/.config`      | `$XDG_CONFIG_HOME/stanza/commands.json`  |
//! | History  | `$XDG_DATA_HOME`   | `~/.local/share` | `$XDG_DATA_HOME/stanza/history.txt`      |

use std::path::PathBuf;

use directories::BaseDirs;

/// Uses `$XDG_CONFIG_HOME/stanza` or falls back to `~/.config/stanza`.
pub fn config_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.config_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".config"))
        .join("stanza")
}

/// Uses `$XDG_DATA_HOME/stanza` or falls back to `~/.local/share/stanza`.
pub fn data_dir() -> PathBuf {
    BaseDirs::new()
        .map(|d| d.data_dir().to_path_buf())
        .unwrap_or_else(|| home_fallback().join(".local").join("share"))
        .join("stanza")
}

pub fn config_file() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn registry_file() -> PathBuf {
    config_dir().join("commands.json")
}

pub fn history_file() -> PathBuf {
    data_dir().join("history.txt")
}

fn home_fallback() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}
