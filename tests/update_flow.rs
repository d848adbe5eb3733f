// tests/update_flow.rs

//! Integration tests for the plumbing around the engine: variant profiles,
//! the path/preference store, archive location, and a full client-style
//! update driven from a profile.

use flate2::write::GzEncoder;
use flate2::Compression;
use packsync::{ArchivePackage, Profile, ReconcileOptions, Reconciler, StateFile};
use std::fs::{self, File};
use std::path::Path;
use tempfile::TempDir;

fn build_archive(path: &Path, entries: &[(&str, &str)]) {
    let file = File::create(path).unwrap();
    let encoder = GzEncoder::new(file, Compression::default());
    let mut builder = tar::Builder::new(encoder);
    for (name, content) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_cksum();
        builder
            .append_data(&mut header, *name, content.as_bytes())
            .unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap();
}

#[test]
fn profile_file_round_trips_through_toml() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("client.toml");
    fs::write(&path, toml::to_string(&Profile::client()).unwrap()).unwrap();

    let loaded = Profile::load(&path).unwrap();
    let builtin = Profile::client();

    assert_eq!(loaded.name, builtin.name);
    assert_eq!(loaded.managed_paths, builtin.managed_paths);
    assert_eq!(loaded.protected, builtin.protected);
    assert_eq!(loaded.denylist, builtin.denylist);
    assert_eq!(loaded.discard, builtin.discard);
    assert_eq!(loaded.min_archive_bytes, builtin.min_archive_bytes);
    assert_eq!(loaded.overlays.len(), builtin.overlays.len());
    assert_eq!(loaded.required_preferences(), builtin.required_preferences());
}

#[test]
fn state_store_remembers_paths_and_preferences() {
    let temp = TempDir::new().unwrap();
    let path = StateFile::default_path(Some(temp.path()));

    let mut state = StateFile::load(&path).unwrap();
    state.set("client.root", "/srv/pack/client");
    state.set("shaders", "n");
    state.save().unwrap();

    let state = StateFile::load(&path).unwrap();
    assert_eq!(state.get("client.root"), Some("/srv/pack/client"));
    assert_eq!(state.get_bool("shaders"), Some(false));
    assert!(state.get("server.root").is_none());
}

#[test]
fn locate_archive_enforces_count_and_size() {
    let temp = TempDir::new().unwrap();

    // Nothing to find
    assert!(packsync::fetch::locate_archive(temp.path(), 0).is_err());

    // One undersized archive
    fs::write(temp.path().join("release.tar.gz"), "small").unwrap();
    assert!(packsync::fetch::locate_archive(temp.path(), 1024).is_err());

    // One well-sized archive
    fs::write(temp.path().join("release.tar.gz"), vec![0u8; 4096]).unwrap();
    let found = packsync::fetch::locate_archive(temp.path(), 1024).unwrap();
    assert_eq!(found, temp.path().join("release.tar.gz"));

    // A second candidate spoils it
    fs::write(temp.path().join("other.tar.gz"), vec![0u8; 4096]).unwrap();
    assert!(packsync::fetch::locate_archive(temp.path(), 1024).is_err());
}

/// A full client update driven from the built-in profile: stale content
/// removed with protection, archive extracted, additional mods and shaders
/// merged with classification, shader settings purged at the stale location.
#[test]
fn client_update_end_to_end() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("release-dir");
    let root = temp.path().join("game");
    fs::create_dir(&base).unwrap();

    // Existing installation with user customizations
    fs::create_dir_all(root.join("config/NEI")).unwrap();
    fs::create_dir_all(root.join("mods")).unwrap();
    fs::create_dir_all(root.join("shaderpacks")).unwrap();
    fs::write(root.join("config/NEI/client.cfg"), "user").unwrap();
    fs::write(root.join("config/InvTweaks.cfg"), "user").unwrap();
    fs::write(root.join("config/forge.cfg"), "stale").unwrap();
    fs::write(root.join("mods/ancient.jar"), "stale").unwrap();
    fs::write(root.join("shaderpacks/optionsshaders.txt"), "stale").unwrap();

    // Overlay directories next to the release archive
    let extra = base.join("additional-mods-client");
    fs::create_dir(&extra).unwrap();
    fs::write(extra.join("HardcoreDarkness.jar"), "extra").unwrap();

    let shaders = base.join("shaders");
    fs::create_dir(&shaders).unwrap();
    fs::write(shaders.join("OptiFine_HD_U_E7.jar"), "of").unwrap();
    fs::write(shaders.join("SEUS-Renewed.zip"), "seus").unwrap();
    fs::write(shaders.join("optionsshaders.txt"), "fresh").unwrap();

    let archive_path = base.join("release-2.7.4.tar.gz");
    build_archive(
        &archive_path,
        &[
            ("mods/BuildCraft.jar", "bc"),
            ("config/forge.cfg", "defaults"),
            ("scripts/main.zs", "script"),
        ],
    );

    let profile = Profile::client();
    let plan = profile.plan(&base, |key| key == "shaders");

    let archive = ArchivePackage::open(&archive_path).unwrap();
    let mut reconciler = Reconciler::new(&root, plan);
    let result = reconciler.run(archive, &ReconcileOptions::default()).unwrap();

    // Protected config survived; stale config was replaced by the archive copy
    assert_eq!(fs::read_to_string(root.join("config/NEI/client.cfg")).unwrap(), "user");
    assert_eq!(fs::read_to_string(root.join("config/InvTweaks.cfg")).unwrap(), "user");
    assert_eq!(fs::read_to_string(root.join("config/forge.cfg")).unwrap(), "defaults");

    // Managed content was replaced and overlays merged on top
    assert!(!root.join("mods/ancient.jar").exists());
    assert!(root.join("mods/BuildCraft.jar").exists());
    assert!(root.join("mods/HardcoreDarkness.jar").exists());

    // Shader classification: OptiFine into mods, packs into shaderpacks,
    // settings at the root with the stale copy purged
    assert!(root.join("mods/OptiFine_HD_U_E7.jar").exists());
    assert!(root.join("shaderpacks/SEUS-Renewed.zip").exists());
    assert_eq!(fs::read_to_string(root.join("optionsshaders.txt")).unwrap(), "fresh");
    assert!(!root.join("shaderpacks/optionsshaders.txt").exists());

    // Overlay sources were consumed, the copy-preserve source was absent (no-op)
    assert!(!extra.exists());
    assert!(!shaders.exists());

    assert!(result.extracted.len() >= 3);
    assert!(result.denied.is_empty());
}

/// A server update denies client-only mods and discards client content.
#[test]
fn server_update_end_to_end() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().join("release-dir");
    let root = temp.path().join("server");
    fs::create_dir(&base).unwrap();
    fs::create_dir_all(root.join("config/JourneyMapServer")).unwrap();
    fs::write(root.join("config/JourneyMapServer/server.cfg"), "user").unwrap();

    let extra = base.join("additional-mods-server");
    fs::create_dir(&extra).unwrap();
    fs::write(extra.join("JourneyMapServer-5.1.jar"), "jm").unwrap();

    let archive_path = base.join("release-2.7.4.tar.gz");
    build_archive(
        &archive_path,
        &[
            ("mods/BuildCraft.jar", "bc"),
            ("mods/OptiFine_HD.jar", "of"),
            ("mods/journeymap-5.1.jar", "jm-client"),
            ("README.md", "readme"),
            ("resourcepacks/pack.zip", "rp"),
        ],
    );

    let profile = Profile::server();
    let plan = profile.plan(&base, |_| false);

    let archive = ArchivePackage::open(&archive_path).unwrap();
    let mut reconciler = Reconciler::new(&root, plan);
    let result = reconciler.run(archive, &ReconcileOptions::default()).unwrap();

    // Client-only mods were denied, the server overlay mod survived
    assert!(root.join("mods/BuildCraft.jar").exists());
    assert!(!root.join("mods/OptiFine_HD.jar").exists());
    assert!(!root.join("mods/journeymap-5.1.jar").exists());
    assert!(root.join("mods/JourneyMapServer-5.1.jar").exists());

    // Client content discarded after extraction
    assert!(!root.join("README.md").exists());
    assert!(!root.join("resourcepacks").exists());

    // Protected server config untouched
    assert_eq!(
        fs::read_to_string(root.join("config/JourneyMapServer/server.cfg")).unwrap(),
        "user"
    );

    assert_eq!(result.denied.len(), 2);
}
