use std::collections::BTreeMap;

use report_instance_manager::db::{instances, navigation};
use report_instance_manager::form::{
    build_fields, default_values, process_submission, FormContext, FormError, SaveAction,
    Submission, TriggerAction,
};
use report_instance_manager::{open_in_memory, AppConfig, Session};

const REPORT: &str = "contribute/summary";

fn submission(pairs: &[(&str, &str)]) -> Submission {
    Submission {
        instance_id: None,
        report_id: REPORT.to_string(),
        create_new: false,
        trigger: TriggerAction::Save,
        values: pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        grouprole: Vec::new(),
        navigation: None,
    }
}

#[test]
fn configure_save_reopen_and_rename_a_menu_linked_report() {
    let conn = open_in_memory().unwrap();
    let config = AppConfig::default();
    let admin = Session::administrator(7);

    // Build the blank form the way a front end would.
    let ctx = FormContext::for_new(REPORT);
    let fields = build_fields(&conn, &config, &admin, &ctx).unwrap();
    assert_eq!(fields[0].name, "title");
    assert!(fields.iter().any(|f| f.name == "parent_id"));
    assert!(fields.iter().all(|f| f.name != "drilldown_id"));

    let defaults = default_values(&conn, &config, &ctx).unwrap();
    assert!(defaults.navigation.is_none());

    // Fill it in: a titled report that lives in the menu and links to its
    // criteria page.
    let mut sub = submission(&[
        ("title", "Monthly contributions"),
        ("is_navigation", "1"),
        ("view_mode", "criteria"),
    ]);
    sub.values
        .insert("permission".to_string(), defaults.permission.clone());
    sub.navigation = defaults.navigation;

    let outcome = process_submission(&conn, &config, &admin, &sub).unwrap();
    assert_eq!(outcome.action, SaveAction::Created);
    assert!(outcome.message.contains("successfully created"));
    assert!(outcome.redirect.contains("output=criteria"));

    let nav_id = instances::navigation_id_of(&conn, outcome.id)
        .unwrap()
        .expect("menu entry should exist");
    let entry = navigation::get_entry(&conn, nav_id).unwrap().unwrap();
    assert_eq!(entry.label, "Monthly contributions");
    assert!(entry
        .url
        .as_deref()
        .unwrap()
        .contains(&format!("report/instance/{}", outcome.id)));

    // Reopening folds the stored row and the menu entry back into defaults.
    let ctx = FormContext::for_instance(outcome.id, REPORT);
    let reopened = default_values(&conn, &config, &ctx).unwrap();
    assert_eq!(reopened.title, "Monthly contributions");
    assert!(reopened.is_navigation);
    let stash = reopened.navigation.expect("stash should round-trip");
    assert_eq!(stash.id, nav_id);

    // Renaming while keeping the menu link updates the entry in place.
    let mut rename = submission(&[("title", "Quarterly contributions"), ("is_navigation", "1")]);
    rename.instance_id = Some(outcome.id);
    rename.navigation = Some(stash);
    let renamed = process_submission(&conn, &config, &admin, &rename).unwrap();
    assert_eq!(renamed.action, SaveAction::Updated);
    assert_eq!(renamed.id, outcome.id);

    assert_eq!(
        instances::navigation_id_of(&conn, outcome.id).unwrap(),
        Some(nav_id)
    );
    let entry = navigation::get_entry(&conn, nav_id).unwrap().unwrap();
    assert_eq!(entry.label, "Quarterly contributions");
}

#[test]
fn copying_a_menu_report_moves_the_entry_to_the_copy() {
    let conn = open_in_memory().unwrap();
    let config = AppConfig::default();
    let admin = Session::administrator(7);

    let source = process_submission(
        &conn,
        &config,
        &admin,
        &submission(&[("title", "Lapsed donors"), ("is_navigation", "1")]),
    )
    .unwrap();
    let nav_id = instances::navigation_id_of(&conn, source.id).unwrap().unwrap();

    // Copy through the form: defaults come from the source row, copy mode
    // forgets the row id but keeps the stashed menu identity.
    let reopened = default_values(
        &conn,
        &config,
        &FormContext::for_instance(source.id, REPORT),
    )
    .unwrap();

    let mut copy = submission(&[("title", "Lapsed donors (testing)"), ("is_navigation", "1")]);
    copy.instance_id = Some(source.id);
    copy.create_new = true;
    copy.navigation = reopened.navigation;

    let outcome = process_submission(&conn, &config, &admin, &copy).unwrap();
    assert_eq!(outcome.action, SaveAction::Copied);
    assert_ne!(outcome.id, source.id);
    assert!(outcome.message.contains("successfully copied"));

    // Both rows exist and parameterise the same report definition.
    let source_row = instances::get_instance(&conn, source.id).unwrap().unwrap();
    let copy_row = instances::get_instance(&conn, outcome.id).unwrap().unwrap();
    assert_eq!(copy_row.report_id, source_row.report_id);

    // The menu entry followed the copy instead of duplicating.
    assert_eq!(
        instances::navigation_id_of(&conn, outcome.id).unwrap(),
        Some(nav_id)
    );
    let entry = navigation::get_entry(&conn, nav_id).unwrap().unwrap();
    assert_eq!(entry.label, "Lapsed donors (testing)");
    assert!(entry
        .url
        .as_deref()
        .unwrap()
        .contains(&format!("report/instance/{}", outcome.id)));
}

#[test]
fn dropping_the_menu_link_prunes_the_rebuilt_menu() {
    let conn = open_in_memory().unwrap();
    let config = AppConfig::default();
    let admin = Session::administrator(7);

    let created = process_submission(
        &conn,
        &config,
        &admin,
        &submission(&[("title", "Board packet"), ("is_navigation", "1")]),
    )
    .unwrap();
    let listed = navigation::navigation_list(&conn).unwrap();
    assert!(listed.iter().any(|row| row.entry.label == "Board packet"));

    let mut update = submission(&[("title", "Board packet")]);
    update.instance_id = Some(created.id);
    process_submission(&conn, &config, &admin, &update).unwrap();

    // The save cooled the cache, so this list is a fresh assembly.
    assert!(!navigation::navigation_cache_is_warm(&conn).unwrap());
    let listed = navigation::navigation_list(&conn).unwrap();
    assert!(listed.iter().all(|row| row.entry.label != "Board packet"));

    // The report itself survives, menu-less.
    let row = instances::get_instance(&conn, created.id).unwrap().unwrap();
    assert_eq!(row.navigation_id, None);
    assert_eq!(row.title, "Board packet");
}

#[test]
fn role_restrictions_saved_through_the_form_bounce_outsiders() {
    let conn = open_in_memory().unwrap();
    let config = AppConfig::default();
    let admin = Session::administrator(7);

    let mut sub = submission(&[("title", "Finance only")]);
    sub.grouprole = vec!["administrator".to_string()];
    let saved = process_submission(&conn, &config, &admin, &sub).unwrap();

    let outsider = Session::for_user(22, vec!["authenticated".to_string()], Vec::new());
    let err = build_fields(
        &conn,
        &config,
        &outsider,
        &FormContext::for_instance(saved.id, REPORT),
    )
    .unwrap_err();
    match err {
        FormError::AccessDenied { redirect } => assert!(redirect.contains("report/list")),
        other => panic!("expected an access denial, got {other:?}"),
    }

    // The restriction round-trips into the editor for someone who holds the
    // role.
    let defaults = default_values(&conn, &config, &FormContext::for_instance(saved.id, REPORT))
        .unwrap();
    assert_eq!(defaults.grouprole, vec!["administrator".to_string()]);
}

#[test]
fn submitted_criteria_round_trip_into_the_stored_blob() {
    let conn = open_in_memory().unwrap();
    let config = AppConfig::default();
    let admin = Session::administrator(7);

    let mut sub = submission(&[("title", "Filtered view"), ("view_mode", "view")]);
    sub.values
        .insert("fields[total_amount]".to_string(), "1".to_string());
    sub.values
        .insert("contribution_status_id".to_string(), "Completed".to_string());

    let outcome = process_submission(&conn, &config, &admin, &sub).unwrap();
    let row = instances::get_instance(&conn, outcome.id).unwrap().unwrap();
    let blob: BTreeMap<String, String> =
        serde_json::from_str(row.form_values.as_deref().unwrap()).unwrap();

    assert_eq!(blob.get("fields[total_amount]").map(String::as_str), Some("1"));
    assert_eq!(
        blob.get("contribution_status_id").map(String::as_str),
        Some("Completed")
    );
    assert!(!blob.contains_key("title"));
}
