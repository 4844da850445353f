// src/cli/handlers/user.rs

//! `info user <email>` and `update user <email> <field> <value>…`
//!
//! Representative resource handlers: they pull typed values off the
//! argument stream and drive the remote API through the retry layer. The
//! wider resource surface of the original tool follows exactly this
//! shape.

use anyhow::Result;
use colored::Colorize;
use serde_json::{json, Map, Value};

use crate::{
    cli::handlers::commons,
    config,
    core::args::{ArgStream, ChoiceOptions, ChoiceSet, UsageErrorKind},
    remote::{
        classify::ErrorKind,
        client::RemoteClient,
        retry::{invoke_with_retry, RemoteError, RetryPolicy},
    },
    CancellationToken,
};

fn entity_set() -> ChoiceSet {
    ChoiceSet::new(["user"])
}

pub fn handle_info(mut args: ArgStream, _cancellation_token: &CancellationToken) -> Result<()> {
    let config = config::load()?;
    args.read_choice("entity type", &entity_set(), &ChoiceOptions::required())?;

    let email = args.read_email("user email")?;
    args.expect_exhausted()?;

    let client = commons::build_client(&config);
    match fetch_user(&client, &email, config.max_attempts) {
        Ok(Some(payload)) => {
            print_user(&payload);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) if e.kind() == Some(ErrorKind::UserNotFound) => {
            Err(anyhow::anyhow!("user {} does not exist", email))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn handle_update(mut args: ArgStream, _cancellation_token: &CancellationToken) -> Result<()> {
    let config = config::load()?;
    args.read_choice("entity type", &entity_set(), &ChoiceOptions::required())?;

    let email = args.read_email("user email")?;
    let body = read_user_fields(&mut args)?;

    let client = commons::build_client(&config);
    match update_user(&client, &email, body, config.max_attempts) {
        Ok(_) => {
            println!("updated user {}", email.bold());
            Ok(())
        }
        // A missing user in a bulk update is worth a warning, not a dead
        // batch: handle the typed kind locally and move on.
        Err(e) if e.kind() == Some(ErrorKind::UserNotFound) => {
            eprintln!("{} user {} does not exist, skipping", "WARNING:".yellow().bold(), email);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Fetches one user record. A missing user comes back as a typed
/// [`ErrorKind::UserNotFound`] on the first occurrence.
fn fetch_user(
    client: &dyn RemoteClient,
    email: &str,
    max_attempts: u32,
) -> Result<Option<Value>, RemoteError> {
    let policy = RetryPolicy { max_attempts, ..RetryPolicy::new() }
        .throwing(&[ErrorKind::UserNotFound]);
    invoke_with_retry(client, "directory.users.get", &json!({ "userKey": email }), &policy)
}

/// Applies an update body to one user record.
fn update_user(
    client: &dyn RemoteClient,
    email: &str,
    body: Map<String, Value>,
    max_attempts: u32,
) -> Result<Option<Value>, RemoteError> {
    let policy = RetryPolicy { max_attempts, ..RetryPolicy::new() }
        .throwing(&[ErrorKind::UserNotFound]);
    invoke_with_retry(
        client,
        "directory.users.update",
        &json!({ "userKey": email, "body": body }),
        &policy,
    )
}

/// Parses the `<field> <value>` pairs of an update command into the API
/// request body.
fn read_user_fields(args: &mut ArgStream) -> Result<Map<String, Value>> {
    let fields = ChoiceSet::new([
        "firstname",
        "lastname",
        "suspended",
        "orgunit",
        "changepassword",
        "note",
    ])
    .alias("givenname", "firstname")
    .alias("familyname", "lastname")
    .alias("ou", "orgunit");

    if args.is_exhausted() {
        return Err(args
            .usage_error(UsageErrorKind::Empty, "at least one field to update")
            .into());
    }

    let mut body = Map::new();
    while !args.is_exhausted() {
        let field = args
            .read_choice("field", &fields, &ChoiceOptions::required())?
            .expect("a required choice always resolves");
        match field.as_str() {
            "firstname" => {
                let value = args.read_string("first name")?;
                name_object(&mut body).insert("givenName".to_string(), Value::String(value));
            }
            "lastname" => {
                let value = args.read_string("last name")?;
                name_object(&mut body).insert("familyName".to_string(), Value::String(value));
            }
            "suspended" => {
                let value = args.read_boolean("suspended")?;
                body.insert("suspended".to_string(), Value::Bool(value));
            }
            "changepassword" => {
                let value = args.read_boolean("change password at next login")?;
                body.insert("changePasswordAtNextLogin".to_string(), Value::Bool(value));
            }
            "orgunit" => {
                let value = args.read_string("org unit path")?;
                body.insert("orgUnitPath".to_string(), Value::String(value));
            }
            "note" => {
                let value = args.read_string("note")?;
                body.insert("notes".to_string(), Value::String(value));
            }
            other => unreachable!("unhandled field choice: {}", other),
        }
    }
    Ok(body)
}

fn name_object(body: &mut Map<String, Value>) -> &mut Map<String, Value> {
    body.entry("name")
        .or_insert_with(|| json!({}))
        .as_object_mut()
        .expect("name is always an object")
}

fn print_user(payload: &Value) {
    if let Some(email) = payload["primaryEmail"].as_str() {
        println!("User: {}", email.bold());
    }
    if let Some(v) = payload["name"]["givenName"].as_str() {
        println!("First Name: {}", v);
    }
    if let Some(v) = payload["name"]["familyName"].as_str() {
        println!("Last Name: {}", v);
    }
    if let Some(v) = payload["suspended"].as_bool() {
        println!("Suspended: {}", v);
    }
    if let Some(v) = payload["orgUnitPath"].as_str() {
        println!("Org Unit: {}", v);
    }
    if let Some(v) = payload["lastLoginTime"].as_str() {
        println!("Last Login: {}", v);
    }
}

// MARK: --- UNIT TESTS ---
