// src/profile.rs

//! Variant profiles
//!
//! A profile carries every policy decision for one installation variant:
//! which top-level paths the run may replace, which suffixes are protected,
//! the denylist for the content directory, overlays, and acquisition
//! limits. Profiles are plain data so client/server/feature policy can be
//! supplied, tested, and varied without touching the engine.

use crate::engine::{
    ClassifierRoute, Denylist, MergeMode, Overlay, OverlayClassifier, ProtectedPaths,
    ReconcilePlan,
};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

fn default_content_dir() -> String {
    "mods".to_string()
}

fn default_mode() -> MergeMode {
    MergeMode::MoveAndPrune
}

/// Policy for one installation variant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// Variant tag ("client", "server", ...)
    pub name: String,

    /// Top-level tree paths this run is authorized to fully replace
    #[serde(default)]
    pub managed_paths: Vec<String>,

    /// Path suffixes that must survive removal
    #[serde(default)]
    pub protected: Vec<String>,

    /// Case-insensitive name prefixes removed from the content directory
    #[serde(default)]
    pub denylist: Vec<String>,

    /// The managed content directory the denylist applies to
    #[serde(default = "default_content_dir")]
    pub content_dir: String,

    /// Tree-relative paths removed unconditionally after extraction
    #[serde(default)]
    pub discard: Vec<String>,

    /// Reject release archives smaller than this many bytes
    #[serde(default)]
    pub min_archive_bytes: u64,

    /// Overlay directories merged after extraction, in order
    #[serde(default)]
    pub overlays: Vec<OverlaySpec>,
}

/// One overlay as written in a profile; the source is a directory name
/// resolved against the base directory at plan time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OverlaySpec {
    pub source: String,
    pub dest: String,
    #[serde(default = "default_mode")]
    pub mode: MergeMode,
    /// Preference key that must be enabled for this overlay to apply
    #[serde(default)]
    pub requires: Option<String>,
    #[serde(default)]
    pub classifier: Option<ClassifierSpec>,
}

/// Routing rules for a classified overlay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierSpec {
    pub default_dest: String,
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
}

/// One classification route
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteSpec {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub settings_file: bool,
    pub dest: String,
}

impl Profile {
    /// Built-in client variant policy
    pub fn client() -> Self {
        Self {
            name: "client".to_string(),
            managed_paths: [
                "config",
                "mods",
                "resourcepacks",
                "resources",
                "scripts",
                "README.md",
                "server.properties",
            ]
            .map(String::from)
            .to_vec(),
            protected: [
                "config/NEI",
                "config/betterquesting.cfg",
                "config/InvTweaks.cfg",
                "config/InGameInfoXML.cfg",
            ]
            .map(String::from)
            .to_vec(),
            denylist: Vec::new(),
            content_dir: default_content_dir(),
            discard: Vec::new(),
            min_archive_bytes: 300_000_000,
            overlays: vec![
                OverlaySpec {
                    source: "additional-mods-client".to_string(),
                    dest: "mods".to_string(),
                    mode: MergeMode::MoveAndPrune,
                    classifier: None,
                    requires: None,
                },
                OverlaySpec {
                    source: "shaders".to_string(),
                    dest: "shaderpacks".to_string(),
                    mode: MergeMode::MoveAndPrune,
                    classifier: Some(ClassifierSpec {
                        default_dest: "shaderpacks".to_string(),
                        routes: vec![
                            RouteSpec {
                                prefix: Some("OptiFine".to_string()),
                                settings_file: false,
                                dest: "mods".to_string(),
                            },
                            RouteSpec {
                                prefix: None,
                                settings_file: true,
                                dest: ".".to_string(),
                            },
                        ],
                    }),
                    requires: Some("shaders".to_string()),
                },
                OverlaySpec {
                    source: "alt-runtime".to_string(),
                    dest: ".".to_string(),
                    mode: MergeMode::CopyPreserve,
                    classifier: None,
                    requires: None,
                },
            ],
        }
    }

    /// Built-in server variant policy. Servers deny content that only makes
    /// sense with a graphical client attached.
    pub fn server() -> Self {
        Self {
            name: "server".to_string(),
            managed_paths: ["config", "mods", "scripts"].map(String::from).to_vec(),
            protected: [
                "config/aroma1997",
                "config/JourneyMapServer",
                "config/opencomputers",
                "config/Morpheus.cfg",
            ]
            .map(String::from)
            .to_vec(),
            denylist: [
                "BeeBetterAtBees",
                "BetterAchievements",
                "bettercrashes",
                "betterloadingscreen",
                "boubs-admin-tools",
                "craftpresence",
                "Controlling",
                "CustomMainMenu",
                "defaultserverlist",
                "DefaultWorldGenerator",
                "IC2+Crop+Plugin",
                "inventorytweaks",
                "itlt",
                "journeymap-",
                "MouseTweaks",
                "NettyPatch",
                "oauth",
                "OptiFine",
                "overloadedarmorbar",
                "ResourceLoader",
                "tcnodetracker",
                "torohealth",
            ]
            .map(String::from)
            .to_vec(),
            content_dir: default_content_dir(),
            discard: ["README.md", "resourcepacks", "resources"]
                .map(String::from)
                .to_vec(),
            min_archive_bytes: 300_000_000,
            overlays: vec![OverlaySpec {
                source: "additional-mods-server".to_string(),
                dest: "mods".to_string(),
                mode: MergeMode::MoveAndPrune,
                classifier: None,
                requires: None,
            }],
        }
    }

    /// Load a profile from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::NotFoundError(format!("cannot read profile {}: {}", path.display(), e))
        })?;
        toml::from_str(&content)
            .map_err(|e| Error::ParseError(format!("invalid profile {}: {}", path.display(), e)))
    }

    /// Preference keys gating any of this profile's overlays
    pub fn required_preferences(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .overlays
            .iter()
            .filter_map(|o| o.requires.clone())
            .collect();
        keys.dedup();
        keys
    }

    /// Resolve this profile into an engine plan. Overlay sources are
    /// resolved against `base_dir`; overlays gated on a preference are kept
    /// only when `overlay_enabled` says so.
    pub fn plan<F>(&self, base_dir: &Path, overlay_enabled: F) -> ReconcilePlan
    where
        F: Fn(&str) -> bool,
    {
        let overlays = self
            .overlays
            .iter()
            .filter(|spec| {
                spec.requires
                    .as_deref()
                    .map_or(true, |key| overlay_enabled(key))
            })
            .map(|spec| spec.resolve(base_dir))
            .collect();

        ReconcilePlan {
            managed: self.managed_paths.clone(),
            protected: ProtectedPaths::new(&self.protected),
            overlays,
            denylist: Denylist::new(&self.denylist),
            content_dir: PathBuf::from(&self.content_dir),
            discard: self.discard.clone(),
        }
    }
}

impl OverlaySpec {
    fn resolve(&self, base_dir: &Path) -> Overlay {
        Overlay {
            source: base_dir.join(&self.source),
            dest: PathBuf::from(&self.dest),
            mode: self.mode,
            classifier: self.classifier.as_ref().map(|spec| OverlayClassifier {
                routes: spec
                    .routes
                    .iter()
                    .map(|route| ClassifierRoute {
                        prefix: route.prefix.clone(),
                        settings_file: route.settings_file,
                        dest: PathBuf::from(&route.dest),
                    })
                    .collect(),
                default_dest: PathBuf::from(&spec.default_dest),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_profiles_sanity() {
        let client = Profile::client();
        assert!(client.denylist.is_empty());
        assert!(client.managed_paths.contains(&"config".to_string()));
        assert_eq!(client.overlays.len(), 3);

        let server = Profile::server();
        assert_eq!(server.denylist.len(), 22);
        assert!(server.discard.contains(&"resourcepacks".to_string()));
        assert!(server.protected.contains(&"config/Morpheus.cfg".to_string()));
    }

    #[test]
    fn test_plan_resolves_overlay_sources() {
        let base = Path::new("/srv/releases");
        let plan = Profile::server().plan(base, |_| true);

        assert_eq!(plan.overlays.len(), 1);
        assert_eq!(
            plan.overlays[0].source,
            PathBuf::from("/srv/releases/additional-mods-server")
        );
        assert_eq!(plan.overlays[0].dest, PathBuf::from("mods"));
    }

    #[test]
    fn test_plan_gates_overlays_on_preferences() {
        let base = Path::new("/srv/releases");

        let with_shaders = Profile::client().plan(base, |_| true);
        assert_eq!(with_shaders.overlays.len(), 3);

        let without = Profile::client().plan(base, |_| false);
        assert_eq!(without.overlays.len(), 2);
        assert!(without
            .overlays
            .iter()
            .all(|o| !o.source.ends_with("shaders")));
    }

    #[test]
    fn test_required_preferences() {
        assert_eq!(Profile::client().required_preferences(), vec!["shaders"]);
        assert!(Profile::server().required_preferences().is_empty());
    }

    #[test]
    fn test_profile_toml_round_trip() {
        let profile = Profile::client();
        let serialized = toml::to_string(&profile).unwrap();
        let parsed: Profile = toml::from_str(&serialized).unwrap();

        assert_eq!(parsed.name, profile.name);
        assert_eq!(parsed.managed_paths, profile.managed_paths);
        assert_eq!(parsed.protected, profile.protected);
        assert_eq!(parsed.min_archive_bytes, profile.min_archive_bytes);
        assert_eq!(parsed.overlays.len(), profile.overlays.len());
    }

    #[test]
    fn test_minimal_profile_defaults() {
        let profile: Profile = toml::from_str(
            r#"
            name = "lean"
            managed_paths = ["mods"]
            "#,
        )
        .unwrap();

        assert_eq!(profile.content_dir, "mods");
        assert_eq!(profile.min_archive_bytes, 0);
        assert!(profile.overlays.is_empty());
        assert!(profile.protected.is_empty());
    }
}
