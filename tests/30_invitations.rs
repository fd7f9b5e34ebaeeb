mod common;

use anyhow::Result;
use axum::http::StatusCode;
use central_admin::database::{
    models::{Invitation, NewInvitation, Organization, User},
    Repository,
};
use uuid::Uuid;

use common::TestApp;

async fn invite(app: &TestApp, org: &Organization, by: &User, email: &str) -> Result<Invitation> {
    Ok(app
        .repo
        .create_invitation(NewInvitation {
            organization_id: org.id,
            email_to_invite: email.to_string(),
            invited_by: by.id,
        })
        .await?)
}

#[tokio::test]
async fn joining_grants_membership_and_uses_up_the_invitation() -> Result<()> {
    let app = TestApp::new();
    let owner = app.user("owner", false).await?;
    let grace = app.user("grace", false).await?;
    let org = app.org(&owner, "Harbor").await?;
    let invitation = invite(&app, &org, &owner, "grace@example.org").await?;
    invite(&app, &org, &owner, "someone.else@example.org").await?;
    assert_eq!(app.repo.invitation_count().await, 2);

    let res = app
        .post_form(&format!("/org_invite_action/{}", invitation.id), Some(&grace), &[("join", "Join")])
        .await?;

    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location(), Some("/org_management"));
    assert_eq!(
        res.flash(),
        vec![("success".to_string(), "You have joined Harbor as an admin.".to_string())]
    );
    assert!(app.repo.is_member(org.id, grace.id).await?);
    assert!(app.repo.get_invitation(invitation.id).await?.is_none());
    assert_eq!(app.repo.invitation_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn declining_removes_the_invitation_without_membership() -> Result<()> {
    let app = TestApp::new();
    let owner = app.user("owner", false).await?;
    let grace = app.user("grace", false).await?;
    let org = app.org(&owner, "Harbor").await?;
    let invitation = invite(&app, &org, &owner, "GRACE@example.org").await?;

    let res = app
        .post_form(
            &format!("/org_invite_action/{}", invitation.id),
            Some(&grace),
            &[("decline", "Decline")],
        )
        .await?;

    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(
        res.flash(),
        vec![("warning".to_string(), "You have declined to join Harbor as an admin.".to_string())]
    );
    assert!(!app.repo.is_member(org.id, grace.id).await?);
    assert_eq!(app.repo.invitation_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn get_changes_nothing() -> Result<()> {
    let app = TestApp::new();
    let owner = app.user("owner", false).await?;
    let grace = app.user("grace", false).await?;
    let org = app.org(&owner, "Harbor").await?;
    let invitation = invite(&app, &org, &owner, "grace@example.org").await?;

    let res = app.get(&format!("/org_invite_action/{}", invitation.id), Some(&grace)).await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location(), Some("/org_management"));
    assert_eq!(app.repo.invitation_count().await, 1);
    assert!(!app.repo.is_member(org.id, grace.id).await?);
    Ok(())
}

#[tokio::test]
async fn only_the_invitee_may_respond() -> Result<()> {
    let app = TestApp::new();
    let owner = app.user("owner", false).await?;
    let mallory = app.user("mallory", false).await?;
    let org = app.org(&owner, "Harbor").await?;
    let invitation = invite(&app, &org, &owner, "grace@example.org").await?;

    let res = app
        .post_form_ajax(&format!("/org_invite_action/{}", invitation.id), Some(&mallory), &[("join", "1")])
        .await?;

    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert!(!app.repo.is_member(org.id, mallory.id).await?);
    assert_eq!(app.repo.invitation_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn unknown_invitation_is_not_found() -> Result<()> {
    let app = TestApp::new();
    let grace = app.user("grace", false).await?;

    let res = app
        .post_form(&format!("/org_invite_action/{}", Uuid::new_v4()), Some(&grace), &[("join", "1")])
        .await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.get("/org_invite_action/not-a-uuid", Some(&grace)).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}
