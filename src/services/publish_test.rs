use super::*;
use crate::models::{CitationFormat, ContentStatus, ContentType};
use crate::state::test_helpers::RecordingPublisher;

fn alice() -> User {
    User { name: "Alice".into(), email: "alice@contoso.com".into(), company: None }
}

fn service(publisher: Option<Arc<RecordingPublisher>>, store: Arc<ReportStore>) -> PublishService {
    PublishService::new(
        publisher.map(|p| p as Arc<dyn Publisher>),
        Some("site-1".into()),
        Some("drive-1".into()),
        store,
        InFlight::new(),
    )
}

fn upload(content: &str, report_id: Option<String>) -> SharePointPublishRequest {
    SharePointPublishRequest {
        file_name: "q3.md".into(),
        content: content.into(),
        folder_path: "/Reports/2024/".into(),
        site_id: None,
        drive_id: None,
        report_id,
    }
}

async fn stored_report(store: &ReportStore, owner: &str) -> String {
    let mut report = Report::new("Summarize Q3 sales", ContentType::Report, CitationFormat::Apa);
    report.set_title("Q3 Sales");
    report.user_id = Some(owner.into());
    report.add_section("Overview", "Sales grew.", vec![]).unwrap();
    report.mark_completed();
    let id = report.id.clone();
    store.insert(report).await;
    id
}

#[tokio::test]
async fn unconfigured_publisher_is_rejected() {
    let svc = service(None, Arc::new(ReportStore::new()));
    assert!(!svc.is_configured());
    let err = svc.publish_sharepoint(&alice(), upload("# hi", None)).await.unwrap_err();
    assert!(matches!(err, PublishError::NotConfigured(_)));
}

#[tokio::test]
async fn invalid_request_fails_before_upload() {
    let publisher = Arc::new(RecordingPublisher::default());
    let svc = service(Some(publisher.clone()), Arc::new(ReportStore::new()));
    let err = svc.publish_sharepoint(&alice(), upload("  ", None)).await.unwrap_err();
    assert!(matches!(err, PublishError::Invalid(_)));
    assert!(publisher.uploads().is_empty());
}

#[tokio::test]
async fn uploads_given_content_with_trimmed_folder() {
    let publisher = Arc::new(RecordingPublisher::default());
    let svc = service(Some(publisher.clone()), Arc::new(ReportStore::new()));
    let resp = svc.publish_sharepoint(&alice(), upload("# Q3", None)).await.unwrap();
    assert!(resp.success);
    assert_eq!(resp.file_name, "q3.md");
    assert!(resp.web_url.is_some());

    let uploads = publisher.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].target.drive_id, "drive-1");
    assert_eq!(uploads[0].folder_path, "Reports/2024");
    assert_eq!(uploads[0].content, "# Q3");
}

#[tokio::test]
async fn renders_owned_report_and_marks_it_published() {
    let store = Arc::new(ReportStore::new());
    let id = stored_report(&store, "alice@contoso.com").await;
    let publisher = Arc::new(RecordingPublisher::default());
    let svc = service(Some(publisher.clone()), store.clone());

    svc.publish_sharepoint(&alice(), upload("", Some(id.clone()))).await.unwrap();

    assert!(publisher.uploads()[0].content.starts_with("# Q3 Sales\n"));
    let report = store.get(&id).await.unwrap();
    assert_eq!(report.status, ContentStatus::Published);
    assert!(report.sharepoint_url.is_some());
}

#[tokio::test]
async fn other_users_report_is_not_found() {
    let store = Arc::new(ReportStore::new());
    let id = stored_report(&store, "bob@contoso.com").await;
    let publisher = Arc::new(RecordingPublisher::default());
    let svc = service(Some(publisher.clone()), store);

    let err = svc.publish_sharepoint(&alice(), upload("", Some(id))).await.unwrap_err();
    assert!(matches!(err, PublishError::ReportNotFound(_)));
    assert!(publisher.uploads().is_empty());
}

#[tokio::test]
async fn duplicate_publish_is_refused_while_in_flight() {
    let publisher = Arc::new(RecordingPublisher::default());
    let inflight = InFlight::new();
    let svc = PublishService::new(
        Some(publisher as Arc<dyn Publisher>),
        Some("site-1".into()),
        Some("drive-1".into()),
        Arc::new(ReportStore::new()),
        inflight.clone(),
    );
    let _held = inflight.try_acquire("sharepoint:drive-1/Reports/2024/q3.md").unwrap();
    let err = svc.publish_sharepoint(&alice(), upload("# Q3", None)).await.unwrap_err();
    assert!(matches!(err, PublishError::InFlight(_)));
    assert!(err.retryable());
}

#[tokio::test]
async fn graph_failure_leaves_report_unpublished() {
    let store = Arc::new(ReportStore::new());
    let id = stored_report(&store, "alice@contoso.com").await;
    let publisher = Arc::new(RecordingPublisher::failing(503));
    let svc = service(Some(publisher), store.clone());

    let err = svc.publish_sharepoint(&alice(), upload("", Some(id.clone()))).await.unwrap_err();
    assert!(matches!(err, PublishError::Graph(GraphError::Response { status: 503, .. })));
    assert!(err.retryable());
    assert_eq!(store.get(&id).await.unwrap().status, ContentStatus::Completed);
}

#[tokio::test]
async fn teams_post_renders_report_with_title_subject() {
    let store = Arc::new(ReportStore::new());
    let id = stored_report(&store, "alice@contoso.com").await;
    let publisher = Arc::new(RecordingPublisher::default());
    let svc = service(Some(publisher.clone()), store.clone());

    let req = TeamsPostRequest {
        team_id: "team-1".into(),
        channel_id: "chan-1".into(),
        message: String::new(),
        subject: None,
        report_id: Some(id.clone()),
    };
    let resp = svc.post_teams(&alice(), req).await.unwrap();
    assert!(resp.success);

    let messages = publisher.messages();
    assert_eq!(messages[0].subject.as_deref(), Some("Q3 Sales"));
    assert!(messages[0].html.starts_with("<h1>Q3 Sales</h1>"));
    let report = store.get(&id).await.unwrap();
    assert_eq!(report.teams_channel.as_deref(), Some("team-1/chan-1"));
}

#[tokio::test]
async fn teams_post_sends_message_verbatim() {
    let publisher = Arc::new(RecordingPublisher::default());
    let svc = service(Some(publisher.clone()), Arc::new(ReportStore::new()));
    let req = TeamsPostRequest {
        team_id: "team-1".into(),
        channel_id: "chan-1".into(),
        message: "<p>Hello</p>".into(),
        subject: Some("Update".into()),
        report_id: None,
    };
    svc.post_teams(&alice(), req).await.unwrap();
    let messages = publisher.messages();
    assert_eq!(messages[0].html, "<p>Hello</p>");
    assert_eq!(messages[0].team_id, "team-1");
}
