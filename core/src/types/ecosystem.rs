use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Package ecosystems understood by the OSV package query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, Ord, PartialOrd)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    PyPI,
    Cargo,
    Go,
    Maven,
    NuGet,
    Composer,
    RubyGems,
    Pub,
    Hex,
}

impl Ecosystem {
    pub const ALL: [Ecosystem; 10] = [
        Ecosystem::Npm,
        Ecosystem::PyPI,
        Ecosystem::Cargo,
        Ecosystem::Go,
        Ecosystem::Maven,
        Ecosystem::NuGet,
        Ecosystem::Composer,
        Ecosystem::RubyGems,
        Ecosystem::Pub,
        Ecosystem::Hex,
    ];

    /// The exact, case-sensitive name OSV expects in `package.ecosystem`.
    pub fn osv_name(&self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::PyPI => "PyPI",
            Ecosystem::Cargo => "crates.io",
            Ecosystem::Go => "Go",
            Ecosystem::Maven => "Maven",
            Ecosystem::NuGet => "NuGet",
            Ecosystem::Composer => "Packagist",
            Ecosystem::RubyGems => "RubyGems",
            Ecosystem::Pub => "Pub",
            Ecosystem::Hex => "Hex",
        }
    }

    /// Maps a user-supplied name to what OSV expects, passing unknown names through.
    pub fn resolve_osv_name(name: &str) -> String {
        name.parse::<Ecosystem>()
            .map(|e| e.osv_name().to_string())
            .unwrap_or_else(|_| name.to_string())
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ecosystem::Npm => write!(f, "npm"),
            Ecosystem::PyPI => write!(f, "pypi"),
            Ecosystem::Cargo => write!(f, "cargo"),
            Ecosystem::Go => write!(f, "go"),
            Ecosystem::Maven => write!(f, "maven"),
            Ecosystem::NuGet => write!(f, "nuget"),
            Ecosystem::Composer => write!(f, "composer"),
            Ecosystem::RubyGems => write!(f, "rubygems"),
            Ecosystem::Pub => write!(f, "pub"),
            Ecosystem::Hex => write!(f, "hex"),
        }
    }
}

impl FromStr for Ecosystem {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "npm" => Ok(Ecosystem::Npm),
            "pypi" | "pip" => Ok(Ecosystem::PyPI),
            "cargo" | "crates.io" => Ok(Ecosystem::Cargo),
            "go" => Ok(Ecosystem::Go),
            "maven" => Ok(Ecosystem::Maven),
            "nuget" => Ok(Ecosystem::NuGet),
            "composer" | "packagist" => Ok(Ecosystem::Composer),
            "rubygems" | "gem" => Ok(Ecosystem::RubyGems),
            "pub" => Ok(Ecosystem::Pub),
            "hex" => Ok(Ecosystem::Hex),
            other => Err(format!("unknown ecosystem '{}'", other)),
        }
    }
}
