use mockall::{Sequence, mock};
use rollout::cloud::{
    AwsClient, DockerClient, ExecEnv, RegistryError, RepositoryStatus, StaticCredentials,
    ToolError, ToolExecutor,
};
use rollout::pipeline::{BuildInput, PipelineError, PipelineOutcome, ReleasePipeline, Stage};
use rollout::publish::PublishError;
use rollout::{ReleaseEvent, ReleaseSettings, RolloutConfig};
use secrecy::SecretString;

mock! {
    Executor {}

    impl ToolExecutor for Executor {
        async fn exec(&self, args: &[String], env: &ExecEnv) -> Result<String, ToolError>;
        async fn exec_streaming(&self, args: &[String], env: &ExecEnv) -> Result<(), ToolError>;
        async fn exec_with_stdin(
            &self,
            args: &[String],
            env: &ExecEnv,
            stdin_data: &[u8],
        ) -> Result<String, ToolError>;
        async fn exec_streaming_with_stdin(
            &self,
            args: &[String],
            env: &ExecEnv,
            stdin_data: &[u8],
        ) -> Result<(), ToolError>;
    }
}

const HOST: &str = "123456789012.dkr.ecr.us-east-1.amazonaws.com";
const IMAGE_ID: &str = "sha256:1111";
const COMMIT: &str = "abc1234def567890abc1234def567890abc1234d";

const STS_RESPONSE: &str = r#"{"Credentials":{"AccessKeyId":"ASIASESSION","SecretAccessKey":"s","SessionToken":"t","Expiration":"2026-10-18T12:00:00Z"}}"#;

const UPDATE_SERVICE_RESPONSE: &str = r#"{"service":{"serviceName":"lila-gif","status":"ACTIVE","desiredCount":1,"runningCount":1,"pendingCount":0,"deployments":[{"id":"ecs-svc/9","status":"PRIMARY","rolloutState":"IN_PROGRESS"}]}}"#;

fn has(args: &[String], needle: &str) -> bool {
    args.iter().any(|a| a == needle)
}

fn failed(program: &str, stderr: &str) -> ToolError {
    ToolError::CommandFailed {
        program: program.to_owned(),
        args: vec![],
        stderr: stderr.to_owned(),
    }
}

fn latest_ref() -> String {
    format!("{HOST}/lila-gif:latest")
}

fn commit_ref() -> String {
    format!("{HOST}/lila-gif:abc1234")
}

fn config(account_id: Option<&str>) -> RolloutConfig {
    let mut config = RolloutConfig::default();
    config.trigger.branch = "master".to_owned();
    config.aws.account_id = account_id.map(str::to_owned);
    config.deploy.cluster = Some("lila".to_owned());
    config.deploy.service = Some("lila-gif".to_owned());
    config
}

fn pipeline(aws: MockExecutor, docker: MockExecutor) -> ReleasePipeline<MockExecutor, MockExecutor> {
    let settings = ReleaseSettings::resolve(&config(Some("123456789012")), "lila-gif").unwrap();
    ReleasePipeline::with_clients(
        settings,
        AwsClient::with_executor(aws),
        DockerClient::with_executor(docker),
    )
}

fn secrets() -> StaticCredentials {
    StaticCredentials::new(
        SecretString::from("AKIASTATIC".to_owned()),
        SecretString::from("static-secret".to_owned()),
    )
}

fn build_input() -> BuildInput {
    BuildInput {
        descriptor: "FROM rust:1.84-bookworm AS builder\n".to_owned(),
        context: ".".into(),
    }
}

fn event(branch: &str) -> ReleaseEvent {
    ReleaseEvent::new(branch, COMMIT).unwrap()
}

// ── Expectation helpers ──

fn expect_session(aws: &mut MockExecutor) {
    aws.expect_exec()
        .withf(|args, _| has(args, "get-session-token"))
        .times(1)
        .returning(|_, _| Ok(STS_RESPONSE.to_owned()));
}

fn expect_create_repository(aws: &mut MockExecutor, already_exists: bool) {
    aws.expect_exec()
        .withf(|args, _| has(args, "create-repository") && has(args, "lila-gif"))
        .times(1)
        .returning(move |_, _| {
            if already_exists {
                Err(failed(
                    "aws",
                    "An error occurred (RepositoryAlreadyExistsException) when calling the CreateRepository operation",
                ))
            } else {
                Ok("{}".to_owned())
            }
        });
}

fn expect_commit_lookup(aws: &mut MockExecutor, existing_digest: Option<&'static str>) {
    aws.expect_exec()
        .withf(|args, _| has(args, "batch-get-image") && has(args, "imageTag=abc1234"))
        .times(1)
        .returning(move |_, _| {
            Ok(match existing_digest {
                Some(digest) => format!(
                    r#"{{"images":[{{"imageManifest":"{{\"config\":{{\"digest\":\"{digest}\"}}}}"}}],"failures":[]}}"#
                ),
                None => r#"{"images":[],"failures":[{"failureCode":"ImageNotFound"}]}"#.to_owned(),
            })
        });
}

fn expect_login_password(aws: &mut MockExecutor) {
    aws.expect_exec()
        .withf(|args, _| has(args, "get-login-password"))
        .times(1)
        .returning(|_, _| Ok("registry-token\n".to_owned()));
}

fn expect_update_service(aws: &mut MockExecutor) {
    aws.expect_exec()
        .withf(|args, _| {
            has(args, "update-service")
                && has(args, "--force-new-deployment")
                && args.windows(2).any(|w| w[0] == "--cluster" && w[1] == "lila")
                && args.windows(2).any(|w| w[0] == "--service" && w[1] == "lila-gif")
        })
        .times(1)
        .returning(|_, _| Ok(UPDATE_SERVICE_RESPONSE.to_owned()));
}

fn expect_build(docker: &mut MockExecutor) {
    docker
        .expect_exec_streaming_with_stdin()
        .withf(|args, _, _| has(args, "build") && has(args, "lila-gif:v1"))
        .times(1)
        .returning(|_, _, _| Ok(()));
    docker
        .expect_exec()
        .withf(|args, _| has(args, "inspect") && has(args, "lila-gif:v1"))
        .times(1)
        .returning(|_, _| Ok(format!("{IMAGE_ID}\n")));
}

/// `docker tag` for both entries, each resolving to `image_id`.
fn expect_tags(docker: &mut MockExecutor, image_id: &'static str) {
    docker
        .expect_exec()
        .withf(|args, _| args.first().is_some_and(|a| a == "tag"))
        .times(2)
        .returning(|_, _| Ok(String::new()));
    docker
        .expect_exec()
        .withf(|args, _| {
            has(args, "inspect") && (has(args, &latest_ref()) || has(args, &commit_ref()))
        })
        .times(2)
        .returning(move |_, _| Ok(format!("{image_id}\n")));
}

fn expect_login(docker: &mut MockExecutor) {
    docker
        .expect_exec_with_stdin()
        .withf(|args, _, _| has(args, "login") && has(args, HOST))
        .times(1)
        .returning(|_, _, _| Ok("Login Succeeded\n".to_owned()));
}

fn push_result(fails: bool) -> Result<(), ToolError> {
    if fails {
        Err(failed("docker", "exit code: 1"))
    } else {
        Ok(())
    }
}

/// Pushes in order `latest`, then the commit tag, each failing on demand.
fn expect_pushes(docker: &mut MockExecutor, latest_fails: bool, commit_fails: bool) {
    let mut seq = Sequence::new();
    docker
        .expect_exec_streaming()
        .withf(|args, _| has(args, "push") && has(args, &latest_ref()))
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_, _| push_result(latest_fails));
    docker
        .expect_exec_streaming()
        .withf(|args, _| has(args, "push") && has(args, &commit_ref()))
        .times(1)
        .in_sequence(&mut seq)
        .returning(move |_, _| push_result(commit_fails));
}

fn happy_aws(already_exists: bool) -> MockExecutor {
    let mut aws = MockExecutor::new();
    expect_session(&mut aws);
    expect_create_repository(&mut aws, already_exists);
    expect_commit_lookup(&mut aws, None);
    expect_login_password(&mut aws);
    expect_update_service(&mut aws);
    aws
}

fn happy_docker() -> MockExecutor {
    let mut docker = MockExecutor::new();
    expect_build(&mut docker);
    expect_tags(&mut docker, IMAGE_ID);
    expect_login(&mut docker);
    expect_pushes(&mut docker, false, false);
    docker
}

// ── Trigger gate ──

#[tokio::test]
async fn non_target_branch_has_no_side_effects() {
    // Mocks without expectations panic on any call.
    let pipeline = pipeline(MockExecutor::new(), MockExecutor::new());

    let outcome = pipeline
        .run(&event("feature-x"), &secrets(), &build_input())
        .await
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::Skipped { ref branch } if branch == "feature-x"));
}

#[tokio::test]
async fn branch_match_is_exact() {
    let pipeline = pipeline(MockExecutor::new(), MockExecutor::new());

    for branch in ["master2", "Master", "refs/heads/main"] {
        let outcome = pipeline
            .run(&event(branch), &secrets(), &build_input())
            .await
            .unwrap();
        assert!(matches!(outcome, PipelineOutcome::Skipped { .. }), "{branch}");
    }
}

// ── Happy path ──

#[tokio::test]
async fn release_publishes_both_tags_and_redeploys() {
    let pipeline = pipeline(happy_aws(false), happy_docker());

    let outcome = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap();

    let PipelineOutcome::Released(report) = outcome else {
        panic!("expected a release");
    };
    assert_eq!(report.tags.latest().tag, "latest");
    assert_eq!(report.tags.commit().tag, "abc1234");
    assert_eq!(report.tags.latest().repository, report.tags.commit().repository);
    assert_eq!(report.artifact.reference, "lila-gif:v1");
    assert_eq!(report.artifact.image_id, IMAGE_ID);
    assert_eq!(report.repository, RepositoryStatus::Created);
    assert_eq!(
        report
            .pushed
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>(),
        vec![latest_ref(), commit_ref()]
    );
    assert_eq!(report.deployment.service_name, "lila-gif");
    assert_eq!(
        report.deployment.primary().map(|d| d.id.as_str()),
        Some("ecs-svc/9")
    );
}

#[tokio::test]
async fn full_ref_branch_is_admitted() {
    let pipeline = pipeline(happy_aws(false), happy_docker());

    let outcome = pipeline
        .run(&event("refs/heads/master"), &secrets(), &build_input())
        .await
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::Released(_)));
}

#[tokio::test]
async fn existing_repository_is_not_an_error() {
    let pipeline = pipeline(happy_aws(true), happy_docker());

    let outcome = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap();

    let PipelineOutcome::Released(report) = outcome else {
        panic!("expected a release");
    };
    assert_eq!(report.repository, RepositoryStatus::AlreadyExists);
}

#[tokio::test]
async fn account_is_resolved_when_not_configured() {
    let mut aws = happy_aws(false);
    aws.expect_exec()
        .withf(|args, env| has(args, "get-caller-identity") && env.get("AWS_SESSION_TOKEN").is_some())
        .times(1)
        .returning(|_, _| Ok("123456789012\n".to_owned()));

    let settings = ReleaseSettings::resolve(&config(None), "lila-gif").unwrap();
    let pipeline = ReleasePipeline::with_clients(
        settings,
        AwsClient::with_executor(aws),
        DockerClient::with_executor(happy_docker()),
    );

    let outcome = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::Released(_)));
}

#[tokio::test]
async fn same_commit_rerun_with_identical_image_proceeds() {
    let mut aws = MockExecutor::new();
    expect_session(&mut aws);
    expect_create_repository(&mut aws, true);
    expect_commit_lookup(&mut aws, Some(IMAGE_ID));
    expect_login_password(&mut aws);
    expect_update_service(&mut aws);

    let pipeline = pipeline(aws, happy_docker());
    let outcome = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap();

    assert!(matches!(outcome, PipelineOutcome::Released(_)));
}

// ── Credentials stage ──

#[tokio::test]
async fn credential_rejection_stops_before_registry_and_orchestrator() {
    let mut aws = MockExecutor::new();
    aws.expect_exec()
        .withf(|args, _| has(args, "get-session-token"))
        .times(1)
        .returning(|_, _| Err(failed("aws", "InvalidClientTokenId")));

    let pipeline = pipeline(aws, MockExecutor::new());
    let err = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Credentials);
    assert_eq!(err.to_string(), "credentials stage failed");
}

#[tokio::test]
async fn missing_secrets_make_no_calls_at_all() {
    let pipeline = pipeline(MockExecutor::new(), MockExecutor::new());

    let err = pipeline
        .run(&event("master"), &StaticCredentials::default(), &build_input())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Credentials(_)));
}

// ── Build stage ──

#[tokio::test]
async fn build_failure_never_reaches_publisher() {
    let mut aws = MockExecutor::new();
    expect_session(&mut aws);

    let mut docker = MockExecutor::new();
    docker
        .expect_exec_streaming_with_stdin()
        .withf(|args, _, _| has(args, "build"))
        .times(1)
        .returning(|_, _, _| Err(failed("docker", "error: could not compile `lila-gif`")));

    let pipeline = pipeline(aws, docker);
    let err = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Build);
}

// ── Publish stage ──

/// Everything up to the pushes succeeds; the redeploy must never run.
fn publish_pipeline(
    latest_fails: bool,
    commit_fails: bool,
) -> ReleasePipeline<MockExecutor, MockExecutor> {
    let mut aws = MockExecutor::new();
    expect_session(&mut aws);
    expect_create_repository(&mut aws, false);
    expect_commit_lookup(&mut aws, None);
    expect_login_password(&mut aws);
    aws.expect_exec()
        .withf(|args, _| has(args, "update-service"))
        .never();

    let mut docker = MockExecutor::new();
    expect_build(&mut docker);
    expect_tags(&mut docker, IMAGE_ID);
    expect_login(&mut docker);
    expect_pushes(&mut docker, latest_fails, commit_fails);

    pipeline(aws, docker)
}

#[tokio::test]
async fn commit_push_failure_reports_partial_publish() {
    let err = publish_pipeline(false, true)
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Publish);
    let PipelineError::Publish(PublishError::PartialPush { pushed, failed }) = &err else {
        panic!("expected a partial push, got {err:?}");
    };
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].tag, "latest");
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].reference.tag, "abc1234");

    let message = std::error::Error::source(&err).map(|s| s.to_string()).unwrap();
    assert!(message.contains(&commit_ref()), "got: {message}");
    assert!(message.contains(&latest_ref()), "got: {message}");
}

#[tokio::test]
async fn latest_push_failure_still_pushes_commit_tag() {
    let err = publish_pipeline(true, false)
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap_err();

    let PipelineError::Publish(PublishError::PartialPush { pushed, failed }) = &err else {
        panic!("expected a partial push, got {err:?}");
    };
    assert_eq!(
        pushed.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
        vec![commit_ref()]
    );
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].reference.to_string(), latest_ref());
}

#[tokio::test]
async fn every_push_failing_reports_nothing_pushed() {
    let err = publish_pipeline(true, true)
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Publish);
    let PipelineError::Publish(PublishError::PartialPush { pushed, failed }) = &err else {
        panic!("expected a partial push, got {err:?}");
    };
    assert!(pushed.is_empty());
    assert_eq!(
        failed.iter().map(|f| f.reference.tag.as_str()).collect::<Vec<_>>(),
        vec!["latest", "abc1234"]
    );

    let message = std::error::Error::source(&err).map(|s| s.to_string()).unwrap();
    assert!(message.contains("pushed none"), "got: {message}");
}

#[tokio::test]
async fn commit_tag_lookup_failure_blocks_every_push() {
    let mut aws = MockExecutor::new();
    expect_session(&mut aws);
    expect_create_repository(&mut aws, true);
    aws.expect_exec()
        .withf(|args, _| has(args, "batch-get-image"))
        .times(1)
        .returning(|_, _| {
            Ok(r#"{"images":[],"failures":[{"failureCode":"UnsupportedImageType","failureReason":"manifest list"}]}"#.to_owned())
        });
    aws.expect_exec()
        .withf(|args, _| has(args, "get-login-password"))
        .never();

    let mut docker = MockExecutor::new();
    expect_build(&mut docker);
    expect_tags(&mut docker, IMAGE_ID);
    docker.expect_exec_streaming().never();

    let pipeline = pipeline(aws, docker);
    let err = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Publish(PublishError::Registry {
            source: RegistryError::ImageLookup { .. }
        })
    ));
}

#[tokio::test]
async fn commit_tag_bound_to_other_image_blocks_every_push() {
    let mut aws = MockExecutor::new();
    expect_session(&mut aws);
    expect_create_repository(&mut aws, true);
    expect_commit_lookup(&mut aws, Some("sha256:9999"));

    let mut docker = MockExecutor::new();
    expect_build(&mut docker);
    expect_tags(&mut docker, IMAGE_ID);
    docker.expect_exec_streaming().never();

    let pipeline = pipeline(aws, docker);
    let err = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Publish(PublishError::CommitTagConflict { ref existing, .. })
            if existing == "sha256:9999"
    ));
}

#[tokio::test]
async fn tag_resolving_to_other_image_is_rejected() {
    let mut aws = MockExecutor::new();
    expect_session(&mut aws);
    expect_create_repository(&mut aws, false);

    let mut docker = MockExecutor::new();
    expect_build(&mut docker);
    docker
        .expect_exec()
        .withf(|args, _| args.first().is_some_and(|a| a == "tag"))
        .times(1)
        .returning(|_, _| Ok(String::new()));
    docker
        .expect_exec()
        .withf(|args, _| has(args, "inspect") && has(args, &latest_ref()))
        .times(1)
        .returning(|_, _| Ok("sha256:2222\n".to_owned()));
    docker.expect_exec_streaming().never();

    let pipeline = pipeline(aws, docker);
    let err = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Publish(PublishError::TagMismatch { .. })
    ));
}

#[tokio::test]
async fn login_failure_is_fatal_before_any_push() {
    let mut aws = MockExecutor::new();
    expect_session(&mut aws);
    expect_create_repository(&mut aws, false);
    expect_commit_lookup(&mut aws, None);
    expect_login_password(&mut aws);

    let mut docker = MockExecutor::new();
    expect_build(&mut docker);
    expect_tags(&mut docker, IMAGE_ID);
    docker
        .expect_exec_with_stdin()
        .withf(|args, _, _| has(args, "login"))
        .times(1)
        .returning(|_, _, _| Err(failed("docker", "unauthorized")));
    docker.expect_exec_streaming().never();

    let pipeline = pipeline(aws, docker);
    let err = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Publish(PublishError::Login { .. })
    ));
}

// ── Deploy stage ──

#[tokio::test]
async fn redeploy_failure_names_deploy_stage() {
    let mut aws = MockExecutor::new();
    expect_session(&mut aws);
    expect_create_repository(&mut aws, false);
    expect_commit_lookup(&mut aws, None);
    expect_login_password(&mut aws);
    aws.expect_exec()
        .withf(|args, _| has(args, "update-service"))
        .times(1)
        .returning(|_, _| Err(failed("aws", "ClusterNotFoundException")));

    let pipeline = pipeline(aws, happy_docker());
    let err = pipeline
        .run(&event("master"), &secrets(), &build_input())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Stage::Deploy);
    assert_eq!(err.to_string(), "deploy stage failed");
}
