mod common;

use anyhow::Result;
use axum::http::StatusCode;
use central_admin::database::Repository;

use common::TestApp;

#[tokio::test]
async fn new_form_renders_blank() -> Result<()> {
    let app = TestApp::new();
    let ada = app.user("ada", false).await?;

    let res = app.get("/organization_form/new", Some(&ada)).await?;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json()?;
    assert_eq!(body["template"], "central/organization_form.html");
    assert_eq!(body["context"]["org_id"], "new");
    assert_eq!(body["context"]["form"]["data"]["name"], "");
    assert!(body["context"]["organization"].is_null());
    Ok(())
}

#[tokio::test]
async fn creating_makes_the_user_owner_and_moves_on_to_zones() -> Result<()> {
    let app = TestApp::new();
    let ada = app.user("ada", false).await?;

    let res = app
        .post_form(
            "/organization_form/new",
            Some(&ada),
            &[("name", "Greenfield"), ("description", "Rural schools"), ("url", "https://greenfield.example.org")],
        )
        .await?;

    assert_eq!(res.status, StatusCode::SEE_OTHER);
    let orgs = app.repo.organizations_for_user(ada.id).await?;
    assert_eq!(orgs.len(), 1);
    let org = &orgs[0];
    assert_eq!(org.name, "Greenfield");
    assert_eq!(org.description.as_deref(), Some("Rural schools"));
    assert!(org.is_owned_by(ada.id));
    let expected = format!("/zone_form/{}/new", org.id);
    assert_eq!(res.location(), Some(expected.as_str()));
    Ok(())
}

#[tokio::test]
async fn editing_keeps_owner_and_returns_to_management() -> Result<()> {
    let app = TestApp::new();
    let owner = app.user("owner", false).await?;
    let helper = app.user("helper", false).await?;
    let org = app.org(&owner, "Before").await?;
    app.repo.add_member(org.id, helper.id).await?;

    let form = app.get(&format!("/organization_form/{}", org.id), Some(&helper)).await?.json()?;
    assert_eq!(form["context"]["form"]["data"]["name"], "Before");

    let res = app
        .post_form(&format!("/organization_form/{}", org.id), Some(&helper), &[("name", "After")])
        .await?;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location(), Some("/org_management"));

    let saved = app.repo.get_organization(org.id).await?.unwrap_or_else(|| panic!("organization vanished"));
    assert_eq!(saved.name, "After");
    assert!(saved.is_owned_by(owner.id));
    Ok(())
}

#[tokio::test]
async fn invalid_form_rerenders_with_errors() -> Result<()> {
    let app = TestApp::new();
    let ada = app.user("ada", false).await?;
    let long_name = "n".repeat(101);

    let res = app
        .post_form("/organization_form/new", Some(&ada), &[("name", long_name.as_str()), ("url", "not a url")])
        .await?;
    assert_eq!(res.status, StatusCode::OK);
    let body = res.json()?;
    assert!(body["context"]["form"]["errors"]["name"].is_string());
    assert!(body["context"]["form"]["errors"]["url"].is_string());
    assert!(app.repo.list_organizations().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn outsiders_cannot_edit() -> Result<()> {
    let app = TestApp::new();
    let owner = app.user("owner", false).await?;
    let outsider = app.user("outsider", false).await?;
    let org = app.org(&owner, "Private").await?;

    let res = app
        .post_form_ajax(&format!("/organization_form/{}", org.id), Some(&outsider), &[("name", "Taken")])
        .await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(app.repo.get_organization(org.id).await?.map(|o| o.name), Some("Private".to_string()));
    Ok(())
}

#[tokio::test]
async fn organizations_with_zones_are_kept() -> Result<()> {
    let app = TestApp::new();
    let owner = app.user("owner", false).await?;
    let org = app.org(&owner, "Busy").await?;
    app.repo.add_zone(org.id, "East", 0).await;
    app.repo.add_zone(org.id, "West", 2).await;

    let res = app
        .post_form(&format!("/delete_organization/{}", org.id), Some(&owner), &[])
        .await?;

    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.location(), Some("/org_management"));
    assert_eq!(
        res.flash(),
        vec![(
            "error".to_string(),
            "You cannot delete 'Busy' because it has 2 zone(s) affiliated with it.".to_string()
        )]
    );
    assert!(app.repo.get_organization(org.id).await?.is_some());
    assert_eq!(app.repo.zone_count(org.id).await?, 2);
    Ok(())
}

#[tokio::test]
async fn organizations_without_zones_are_deleted() -> Result<()> {
    let app = TestApp::new();
    let owner = app.user("owner", false).await?;
    let org = app.org(&owner, "Empty").await?;

    let res = app
        .post_form(&format!("/delete_organization/{}", org.id), Some(&owner), &[])
        .await?;

    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(res.flash()[0].0, "success");
    assert!(app.repo.get_organization(org.id).await?.is_none());
    assert!(app.repo.organizations_for_user(owner.id).await?.is_empty());
    Ok(())
}
