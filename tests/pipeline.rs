use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cvepatch_harvester::{
    MetadataStore, Orchestrator, RunConfig, RunTarget, SeverityEntry, ToolError, VcsTool,
};

const H1: &str = "2e9466c84e5beee964e1898dd1f37c3509fa8853";
const H2: &str = "0000000000000000000000000000000000000abc";
const H3: &str = "1111111111111111111111111111111111111111";
const H4: &str = "ffffffffffffffffffffffffffffffffffffffff";

/// Serves canned `log` output per working copy and `show` output per hash.
#[derive(Default)]
struct ScriptedVcs {
    logs: HashMap<PathBuf, String>,
    shows: HashMap<String, Vec<u8>>,
}

impl ScriptedVcs {
    fn with_log(mut self, repo_dir: impl Into<PathBuf>, log: String) -> Self {
        self.logs.insert(repo_dir.into(), log);
        self
    }

    fn with_show(mut self, hash: &str) -> Self {
        self.shows.insert(
            hash.to_string(),
            format!("commit {}\nAuthor: A <a@x>\n\ndiff --git a/f b/f\n", hash).into_bytes(),
        );
        self
    }
}

impl VcsTool for ScriptedVcs {
    fn log(&self, repo_dir: &Path, _pattern: &str) -> Result<String, ToolError> {
        self.logs
            .get(repo_dir)
            .cloned()
            .ok_or_else(|| ToolError::Failed {
                command: "git log".to_string(),
                status: "exit status: 128".to_string(),
                stderr: format!("{} is not a git repository", repo_dir.display()),
            })
    }

    fn show(&self, _repo_dir: &Path, commit_hash: &str) -> Result<Vec<u8>, ToolError> {
        self.shows
            .get(commit_hash)
            .cloned()
            .ok_or_else(|| ToolError::Failed {
                command: format!("git show {}", commit_hash),
                status: "exit status: 128".to_string(),
                stderr: "bad object".to_string(),
            })
    }
}

fn commit(hash: &str, message: &str) -> String {
    format!(
        "commit {}\nAuthor:     A <a@x>\nAuthorDate: Mon Aug 15 10:00:00 2016\nCommit:     A <a@x>\nCommitDate: Mon Aug 15 10:00:00 2016\n\n    {}\n",
        hash, message
    )
}

fn store() -> Arc<MetadataStore> {
    Arc::new(
        [(
            "CVE-2014-6416".to_string(),
            SeverityEntry("7.5".to_string(), "CWE-89".to_string()),
        )]
        .into_iter()
        .collect(),
    )
}

fn config(root: &Path, target: RunTarget, debug: bool) -> RunConfig {
    RunConfig {
        repo_name: "linux".to_string(),
        target,
        git_binary: PathBuf::from("git"),
        git_storage_path: root.join("gitrepos"),
        output_root: root.join("diff"),
        metadata_path: root.join("cvedata.json"),
        debug,
        workers: Some(4),
    }
}

fn artifacts(dir: &Path) -> BTreeSet<String> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect()
}

#[tokio::test]
async fn test_single_repository_run() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path(), RunTarget::Single, false);

    let log = [
        commit(H1, "Fix SQL injection (CVE-2014-6416)"),
        commit(H2, "Fix CVE-2014-6418, CVE-2014-6417 and CVE-2014-6416"),
        commit(H3, "Revert \"Fix CVE-2015-1234\""),
        commit(H4, "Unrelated CVE-20 mention"),
    ]
    .join("\n");
    let vcs = ScriptedVcs::default()
        .with_log(config.repo_dir(None), log)
        .with_show(H1)
        .with_show(H2);

    let summary = Orchestrator::with_console(
        &config,
        Arc::new(vcs),
        store(),
        Box::new(std::io::sink()),
    )
    .run()
    .await
    .unwrap();

    let expected: BTreeSet<String> = [
        format!("CVE-2014-6416_7.5_CWE-089_{}.diff", H1),
        format!("CVE-2014-6416_7.5_CWE-089_{}.diff", H2),
    ]
    .into_iter()
    .collect();
    assert_eq!(artifacts(&config.artifact_dir()), expected);
    assert_eq!(summary.artifact_count, 2);
    assert_eq!(summary.report.false_positives, 1);
    assert_eq!(summary.report.no_identifier, 1);
    assert!(summary.report.failures.is_empty());

    let content = std::fs::read_to_string(
        config
            .artifact_dir()
            .join(format!("CVE-2014-6416_7.5_CWE-089_{}.diff", H1)),
    )
    .unwrap();
    assert_eq!(
        content,
        format!("commit {}\nAuthor: A <a@x>\n\ndiff --git a/f b/f\n", H1)
    );

    let deps = std::fs::read_to_string(root.path().join("diff/dependency_linux")).unwrap();
    assert_eq!(
        deps,
        format!(
            "CVE-2014-6416_{}\tCVE-2014-6416_CVE-2014-6417_CVE-2014-6418_\n",
            H2
        )
    );
}

#[tokio::test]
async fn test_rerun_overwrites_artifacts() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path(), RunTarget::Single, true);
    let vcs: Arc<dyn VcsTool> = Arc::new(
        ScriptedVcs::default()
            .with_log(config.repo_dir(None), commit(H1, "CVE-2016-0001"))
            .with_show(H1),
    );

    let path = config
        .artifact_dir()
        .join(format!("CVE-2016-0001_0.0_CWE-000_{}.diff", H1));

    Orchestrator::with_console(&config, Arc::clone(&vcs), store(), Box::new(std::io::sink()))
        .run()
        .await
        .unwrap();
    let first = std::fs::read(&path).unwrap();

    let summary = Orchestrator::with_console(&config, vcs, store(), Box::new(std::io::sink()))
        .run()
        .await
        .unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), first);
    assert_eq!(summary.artifact_count, 1);
}

#[tokio::test]
async fn test_aggregate_run_tags_sub_repository_and_skips_broken_ones() {
    let root = tempfile::tempdir().unwrap();
    let config = config(
        root.path(),
        RunTarget::Aggregate(vec![
            "platform/bionic".to_string(),
            "platform/missing".to_string(),
            "kernel/common".to_string(),
        ]),
        false,
    );

    let vcs = ScriptedVcs::default()
        .with_log(
            config.repo_dir(Some("platform/bionic")),
            commit(H1, "Fix CVE-2014-6416"),
        )
        .with_log(
            config.repo_dir(Some("kernel/common")),
            [commit(H3, "CVE-2016-5195"), commit(H4, "CVE-2016-5696")].join("\n"),
        )
        .with_show(H1)
        .with_show(H3);

    let summary = Orchestrator::with_console(
        &config,
        Arc::new(vcs),
        store(),
        Box::new(std::io::sink()),
    )
    .run()
    .await
    .unwrap();

    // H4 has no show output: reported as a failure, the rest is archived
    assert_eq!(summary.report.artifacts.len(), 2);
    assert_eq!(summary.report.failures.len(), 1);
    assert_eq!(summary.artifact_count, 2);

    let bionic = std::fs::read_to_string(
        config
            .artifact_dir()
            .join(format!("CVE-2014-6416_7.5_CWE-089_{}.diff", H1)),
    )
    .unwrap();
    assert!(bionic.starts_with(&format!("platform/bionic\ncommit {}\n", H1)));

    let kernel = std::fs::read_to_string(
        config
            .artifact_dir()
            .join(format!("CVE-2016-5195_0.0_CWE-000_{}.diff", H3)),
    )
    .unwrap();
    assert!(kernel.starts_with("kernel/common\n"));
}

#[tokio::test]
async fn test_missing_repository_yields_empty_run() {
    let root = tempfile::tempdir().unwrap();
    let config = config(root.path(), RunTarget::Single, false);

    let summary = Orchestrator::with_console(
        &config,
        Arc::new(ScriptedVcs::default()),
        store(),
        Box::new(std::io::sink()),
    )
    .run()
    .await
    .unwrap();

    assert_eq!(summary.artifact_count, 0);
    assert_eq!(summary.report.processed(), 0);
    assert!(config.artifact_dir().is_dir());
}
