use std::fs::{self, File};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::Receiver;
use vsci_common::config::Config;
use vsci_common::error::VsciError;
use vsci_common::model::{InstallRequest, InstallSource};
use vsci_common::pipeline::{EventEmitter, InstallEvent, InstallStage};
use vsci_core::{remove_app, update_existing_app, InstallContext, Installer, UpdateOptions};

const ELF: &[u8] = b"\x7fELF\x02\x01\x01\x00not-really-a-binary";

struct Fixture {
    _tmp: tempfile::TempDir,
    root: PathBuf,
    config: Config,
}

impl Fixture {
    fn new() -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        let config = Config::rooted_at(&root);
        Self {
            _tmp: tmp,
            root,
            config,
        }
    }

    /// Writes a gzipped tarball; every entry is made executable.
    fn tarball(&self, name: &str, files: &[(&str, &[u8])]) -> PathBuf {
        let path = self.root.join(name);
        let file = File::create(&path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (entry, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            builder.append_data(&mut header, entry, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap().flush().unwrap();
        path
    }

    fn context(&self) -> (InstallContext, Receiver<InstallEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let ctx = InstallContext::new(self.config.clone(), EventEmitter::new(tx))
            .unwrap()
            .with_elevation(false);
        (ctx, rx)
    }

    fn request(&self, archive: &Path) -> InstallRequest {
        InstallRequest::new(
            InstallSource::Local(archive.to_path_buf()),
            &self.config.default_install_root,
        )
    }

    fn staging_dirs(&self) -> Vec<PathBuf> {
        match fs::read_dir(&self.config.temp_root) {
            Ok(rd) => rd
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| {
                    p.file_name()
                        .is_some_and(|n| n.to_string_lossy().starts_with("vsc_installer_temp_"))
                })
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

fn drain(rx: &Receiver<InstallEvent>) -> Vec<InstallEvent> {
    rx.try_iter().collect()
}

fn progress_values(events: &[InstallEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match e {
            InstallEvent::Progress(p) => Some(*p),
            _ => None,
        })
        .collect()
}

fn completion(events: &[InstallEvent]) -> Option<bool> {
    events.iter().rev().find_map(|e| match e {
        InstallEvent::Completed { success, .. } => Some(*success),
        _ => None,
    })
}

#[test]
fn installs_nested_binary_end_to_end() {
    let fx = Fixture::new();
    let archive = fx.tarball(
        "app-1.0.0.tar.gz",
        &[("bin/app-1.0.0-linux/app", ELF), ("bin/app-1.0.0-linux/LICENSE", b"MIT".as_slice())],
    );
    let (ctx, rx) = fx.context();

    let report = Installer::new(ctx).install(fx.request(&archive)).unwrap();

    let opt = fx.config.default_install_root.clone();
    assert_eq!(report.app.name, "app");
    assert_eq!(report.app.install_path, opt.join("app"));
    assert_eq!(report.app.exec_path, opt.join("app/app"));
    assert_eq!(report.app.version, "unknown");
    assert_eq!(report.app.source_url, None);
    assert!(report.registered);
    assert!(opt.join("app/LICENSE").is_file());

    let events = drain(&rx);
    let progress = progress_values(&events);
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(completion(&events), Some(true));
    assert!(events
        .iter()
        .any(|e| matches!(e, InstallEvent::StageChanged(InstallStage::CleaningUp))));
    assert!(fx.staging_dirs().is_empty());

    let (ctx, _rx) = fx.context();
    let stored = ctx.registry.get("app").unwrap().unwrap();
    assert_eq!(stored.install_path, opt.join("app"));
}

#[test]
fn reinstall_replaces_previous_contents() {
    let fx = Fixture::new();
    let first = fx.tarball("a1.tar.gz", &[("app/app", ELF), ("app/old.txt", b"1".as_slice())]);
    let second = fx.tarball("a2.tar.gz", &[("app/app", ELF), ("app/new.txt", b"2".as_slice())]);

    let (ctx, _rx) = fx.context();
    Installer::new(ctx).install(fx.request(&first)).unwrap();
    let (ctx, _rx) = fx.context();
    Installer::new(ctx).install(fx.request(&second)).unwrap();

    let final_dir = fx.config.default_install_root.join("app");
    assert!(final_dir.join("new.txt").is_file());
    assert!(!final_dir.join("old.txt").exists());
    let entries = fs::read_dir(&fx.config.default_install_root).unwrap().count();
    assert_eq!(entries, 1);
}

#[test]
fn unsupported_archive_leaves_no_staging_dir() {
    let fx = Fixture::new();
    let archive = fx.root.join("app.zip");
    fs::write(&archive, b"PK\x03\x04").unwrap();
    let (ctx, rx) = fx.context();

    let err = Installer::new(ctx).install(fx.request(&archive)).unwrap_err();
    assert!(matches!(err, VsciError::UnsupportedFormat(_)));
    assert!(fx.staging_dirs().is_empty());
    assert_eq!(completion(&drain(&rx)), Some(false));
}

#[test]
fn archive_without_executable_is_a_locate_failure() {
    let fx = Fixture::new();
    let archive = fx.tarball("docs.tar.gz", &[("docs/README", b"#no shebang".as_slice())]);
    let (ctx, _rx) = fx.context();

    let err = Installer::new(ctx).install(fx.request(&archive)).unwrap_err();
    assert!(matches!(err, VsciError::LocateFailure(_)));
    assert!(fx.staging_dirs().is_empty());
    assert!(!fx.config.default_install_root.join("README").exists());
}

#[test]
fn version_is_probed_from_installed_script() {
    let fx = Fixture::new();
    let script = b"#!/bin/sh\nif [ \"$1\" = \"--version\" ]; then echo 'MyApp 2.4.1 (build 99)'; fi\n";
    let archive = fx.tarball("myapp.tar.gz", &[("myapp-linux/myapp", script.as_slice())]);
    let (ctx, _rx) = fx.context();

    let report = Installer::new(ctx).install(fx.request(&archive)).unwrap();
    assert_eq!(report.app.version, "2.4.1");
    assert!(report.warnings.is_empty());
}

#[test]
fn integrations_are_created_and_kept_on_update() {
    let fx = Fixture::new();
    fs::create_dir_all(&fx.config.symlink_dir).unwrap();
    let archive = fx.tarball("code.tar.gz", &[("VSCode-linux-x64/code", ELF)]);
    let (ctx, _rx) = fx.context();

    let request = fx.request(&archive).with_symlink(true).with_desktop(true);
    let report = Installer::new(ctx).install(request).unwrap();
    assert_eq!(report.app.name, "VSCode");

    let exec = fx.config.default_install_root.join("VSCode/code");
    let link = fx.config.symlink_path("VSCode");
    assert_eq!(fs::read_link(&link).unwrap(), exec);
    let desktop = fx.config.user_applications_dir.join("VSCode.desktop");
    let content = fs::read_to_string(&desktop).unwrap();
    assert!(content.contains("Name=Visual Studio Code"));
    assert!(content.contains(&format!("Exec={}", exec.display())));
    assert_eq!(report.app.symlink_path.as_ref(), Some(&link));
    assert_eq!(report.app.desktop_entry_path.as_ref(), Some(&desktop));

    fs::remove_file(&link).unwrap();
    let newer = fx.tarball(
        "code-2.tar.gz",
        &[
            ("VSCode-linux-x64/code", ELF),
            ("VSCode-linux-x64/v2", b"".as_slice()),
        ],
    );
    let (ctx, _rx) = fx.context();
    let updated = update_existing_app(
        ctx,
        "VSCode",
        InstallSource::Local(newer),
        UpdateOptions::default(),
    )
    .unwrap();

    assert_eq!(updated.app.install_path, report.app.install_path);
    assert_eq!(updated.app.created_at, report.app.created_at);
    assert!(fx.config.default_install_root.join("VSCode/v2").exists());
    assert!(link.is_symlink());
}

#[test]
fn system_path_without_privileges_requests_elevation() {
    let fx = Fixture::new();
    let archive = fx.tarball("app.tar.gz", &[("app/app", ELF)]);
    let (ctx, rx) = fx.context();
    let request = InstallRequest::new(
        InstallSource::Local(archive),
        "/opt/vsci-integration-test-missing",
    );

    let err = Installer::new(ctx).install(request).unwrap_err();
    assert!(err.is_elevation_required());
    let events = drain(&rx);
    assert!(events
        .iter()
        .any(|e| matches!(e, InstallEvent::ElevationRequired)));
    assert_eq!(completion(&events), Some(false));
    assert!(fx.staging_dirs().is_empty());
}

#[test]
fn removal_after_install_cleans_up_everything() {
    let fx = Fixture::new();
    fs::create_dir_all(&fx.config.symlink_dir).unwrap();
    let archive = fx.tarball("tool.tar.gz", &[("tool/tool", ELF)]);
    let (ctx, _rx) = fx.context();
    Installer::new(ctx)
        .install(fx.request(&archive).with_symlink(true))
        .unwrap();

    let (ctx, _rx) = fx.context();
    let report = remove_app(ctx, "tool").unwrap();
    assert!(report.removed_dir);
    assert!(report.removed_symlink.is_some());
    assert!(!fx.config.default_install_root.join("tool").exists());
    assert!(!fx.config.symlink_path("tool").is_symlink());

    let (ctx, _rx) = fx.context();
    assert!(ctx.registry.get("tool").unwrap().is_none());
}

#[test]
fn hidden_helper_script_does_not_touch_other_apps() {
    let fx = Fixture::new();
    let opt = fx.config.default_install_root.clone();
    fs::create_dir_all(opt.join("OtherApp")).unwrap();
    fs::write(opt.join("OtherApp/keep"), b"keep").unwrap();
    let archive = fx.tarball(
        "app.tar.gz",
        &[("app/.postinstall", b"#!/bin/sh\n".as_slice()), ("app/app", ELF)],
    );
    let (ctx, _rx) = fx.context();

    let report = Installer::new(ctx).install(fx.request(&archive)).unwrap();
    assert_eq!(report.app.name, "app");
    assert_eq!(report.app.install_path, opt.join("app"));
    assert_eq!(report.app.exec_path, opt.join("app/app"));
    assert!(opt.join("OtherApp/keep").is_file());
}

#[test]
fn registry_failure_is_only_a_warning() {
    let fx = Fixture::new();
    let archive = fx.tarball("app.tar.gz", &[("app/app", ELF)]);
    let (ctx, rx) = fx.context();
    // A directory where the registry file belongs makes every read fail.
    fs::create_dir_all(fx.config.registry_path()).unwrap();

    let report = Installer::new(ctx).install(fx.request(&archive)).unwrap();
    assert!(!report.registered);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("could not record app")));
    assert!(fx.config.default_install_root.join("app/app").is_file());

    let events = drain(&rx);
    assert_eq!(completion(&events), Some(true));
    assert_eq!(progress_values(&events).last(), Some(&100));
}

#[test]
fn desktop_entry_failure_is_only_a_warning() {
    let fx = Fixture::new();
    let apps_dir = fx.config.user_applications_dir.clone();
    fs::create_dir_all(apps_dir.parent().unwrap()).unwrap();
    fs::write(&apps_dir, b"not a directory").unwrap();
    let archive = fx.tarball("app.tar.gz", &[("app/app", ELF)]);
    let (ctx, _rx) = fx.context();

    let report = Installer::new(ctx)
        .install(fx.request(&archive).with_desktop(true))
        .unwrap();
    assert!(report.registered);
    assert_eq!(report.app.desktop_entry_path, None);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.contains("Could not create desktop entry")));
}

/// Serves `body` once over plain HTTP and returns the URL to fetch it from.
fn serve_once(body: Vec<u8>, file_name: &str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/downloads/{file_name}", listener.local_addr().unwrap());
    thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        while reader.read_line(&mut line).unwrap() > 0 {
            if line == "\r\n" {
                break;
            }
            line.clear();
        }
        write!(
            stream,
            "HTTP/1.1 200 OK\r\nContent-Type: application/gzip\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        )
        .unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();
    });
    url
}

#[test]
fn url_source_is_downloaded_installed_and_cleaned_up() {
    let fx = Fixture::new();
    let archive = fx.tarball("remote.tar.gz", &[("remote-1.2/remote", ELF)]);
    let url = serve_once(fs::read(&archive).unwrap(), "remote-1.2.tar.gz");
    let (ctx, rx) = fx.context();
    let request = InstallRequest::new(
        InstallSource::Url(url.clone()),
        &fx.config.default_install_root,
    );

    let report = Installer::new(ctx).install(request).unwrap();
    assert_eq!(report.app.name, "remote");
    assert_eq!(report.app.source_url.as_deref(), Some(url.as_str()));
    assert!(fx.config.default_install_root.join("remote/remote").is_file());

    let leftovers: Vec<_> = fs::read_dir(&fx.config.temp_root)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            name.starts_with("vsci_download_") || name.starts_with("vsc_installer_temp_")
        })
        .collect();
    assert!(leftovers.is_empty());

    let events = drain(&rx);
    assert_eq!(completion(&events), Some(true));
    assert!(events
        .iter()
        .any(|e| matches!(e, InstallEvent::StageChanged(InstallStage::Downloading))));

    let (ctx, _rx) = fx.context();
    let stored = ctx.registry.get("remote").unwrap().unwrap();
    assert_eq!(stored.source_url.as_deref(), Some(url.as_str()));
}
