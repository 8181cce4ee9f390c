//! Command handlers.
//!
//! Each handler is the terminal stand-in for one of the original
//! administration pages: thin glue that collects input, calls the client
//! library, and renders the outcome. Errors bubble to `main`, which prints
//! exactly one user-visible message per failed operation.

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use colored::Colorize;
use rustyline::DefaultEditor;

use gymdesk_client::GymClient;
use gymdesk_common::{
    AttendanceRequest, BloodType, ClientGoal, ClientRecord, Credentials, FeeCollectionRequest,
    Gender, NewMembership, NewSubscription, PageQuery, RegisterRequest, SortOrder,
};

use crate::display;
use crate::form::{ClientForm, FieldError, FormPolicy, ValidatedClient};

/// Resolve a password from the flag, the environment, or a prompt.
fn resolve_password(password: Option<String>) -> Result<String> {
    if let Some(password) = password {
        return Ok(password);
    }
    if let Ok(password) = std::env::var("GYMDESK_PASSWORD")
        && !password.is_empty()
    {
        return Ok(password);
    }
    let mut rl = DefaultEditor::new()?;
    let password = rl.readline("password: ")?;
    Ok(password.trim().to_string())
}

pub async fn login(gym: &GymClient, email: String, password: Option<String>) -> Result<()> {
    let password = resolve_password(password)?;
    let session = gym
        .auth()
        .login(&Credentials::new(email, password))
        .await
        .map_err(|e| {
            if e.is_authentication_error() {
                anyhow::anyhow!("Invalid credentials")
            } else {
                e.into()
            }
        })?;

    let who = session.user.map_or_else(String::new, |u| format!(" as {}", u.email));
    display::success(&format!("Signed in{who}"));
    Ok(())
}

pub async fn register(gym: &GymClient, email: String, password: Option<String>) -> Result<()> {
    let password = resolve_password(password)?;
    let session = gym
        .auth()
        .register(&RegisterRequest::new(email, password))
        .await?;

    let who = session.user.map_or_else(String::new, |u| format!(" as {}", u.email));
    display::success(&format!("Account created; signed in{who}"));
    Ok(())
}

pub fn logout(gym: &GymClient) {
    gym.auth().logout();
    display::success("Signed out");
}

pub async fn whoami(gym: &GymClient) -> Result<()> {
    if !gym.auth().is_authenticated() {
        println!("Not signed in. Run {}.", "gymdesk login".cyan());
        return Ok(());
    }
    match gym.auth().current_user() {
        Some(user) => {
            println!("Signed in as {}", user.email.bold());
            if let Some(role) = user.role {
                println!("Role: {}", role.name);
            }
        }
        None => {
            // The stored session predates the user mirror; ask the backend.
            let profile = gym.auth().me().await?;
            println!("Signed in as {}", profile.email.bold());
        }
    }
    Ok(())
}

pub async fn clients_list(
    gym: &GymClient,
    page: u32,
    quantity: Option<u32>,
    sort_by: Option<String>,
    sort_order: Option<SortOrder>,
    search: Option<String>,
) -> Result<()> {
    let mut query = PageQuery::new().with_page(page);
    if let Some(quantity) = quantity {
        query = query.with_quantity(quantity);
    }
    if let Some(sort_by) = sort_by {
        query = query.with_sort(sort_by, sort_order.unwrap_or(SortOrder::Asc));
    }
    if let Some(search) = search {
        query = query.with_search(search);
    }

    let result = gym.clients().list(&query).await?;
    display::client_table(&result, page);
    Ok(())
}

pub async fn clients_show(gym: &GymClient, id: i64) -> Result<()> {
    let record = find_record(gym, id)
        .await?
        .with_context(|| format!("No client with id {id}"))?;
    display::client_details(&record);
    Ok(())
}

pub async fn clients_add(gym: &GymClient, policy: FormPolicy) -> Result<()> {
    let mut form = ClientForm::new(policy);
    form.begin_editing();
    let valid = run_client_form(gym, &mut form).await?;

    form.begin_submit();
    let created = gym.clients().create(&valid.into_create_request()).await;
    match created {
        Ok(record) => {
            form.finish_submit(true);
            display::success(&format!(
                "Created client #{} ({} {})",
                record.id, record.name, record.last_name
            ));
            Ok(())
        }
        Err(e) => {
            form.finish_submit(false);
            Err(e.into())
        }
    }
}

pub async fn clients_edit(gym: &GymClient, policy: FormPolicy, id: i64) -> Result<()> {
    let record = find_record(gym, id)
        .await?
        .with_context(|| format!("No client with id {id}"))?;

    let mut form = ClientForm::from_record(&record, policy);
    let valid = run_client_form(gym, &mut form).await?;

    form.begin_submit();
    let updated = gym.clients().update(id, &valid.into_update_request()).await;
    match updated {
        Ok(record) => {
            form.finish_submit(true);
            display::success(&format!(
                "Updated client #{} ({} {})",
                record.id, record.name, record.last_name
            ));
            Ok(())
        }
        Err(e) => {
            form.finish_submit(false);
            Err(e.into())
        }
    }
}

pub async fn clients_remove(gym: &GymClient, id: i64, yes: bool) -> Result<()> {
    if !yes {
        let mut rl = DefaultEditor::new()?;
        let answer = rl.readline(&format!("Delete client #{id}? [y/N] "))?;
        if !answer.trim().eq_ignore_ascii_case("y") {
            println!("Aborted.");
            return Ok(());
        }
    }

    let status = gym.clients().delete(id).await?;
    display::success(status.message.as_deref().unwrap_or("Client deleted"));
    Ok(())
}

pub async fn attendance(gym: &GymClient, document_number: String) -> Result<()> {
    let status = gym
        .clients()
        .register_attendance(&AttendanceRequest::new(document_number))
        .await?;
    display::success(status.message.as_deref().unwrap_or("Attendance registered"));
    Ok(())
}

pub async fn charge(
    gym: &GymClient,
    client_id: i64,
    amount: f64,
    membership_id: Option<i64>,
    date: Option<String>,
) -> Result<()> {
    let date = date
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .with_context(|| format!("'{raw}' is not a date (use YYYY-MM-DD)"))
        })
        .transpose()?;

    let request = FeeCollectionRequest {
        client_id,
        amount,
        membership_id,
        date,
    };
    let status = gym.clients().register_fee_collection(&request).await?;
    display::success(status.message.as_deref().unwrap_or("Payment registered"));
    Ok(())
}

pub async fn subscription_show(gym: &GymClient, client_id: i64) -> Result<()> {
    let subscription = gym.clients().current_subscription(client_id).await?;
    let plan = subscription
        .membership
        .as_ref()
        .map_or_else(|| format!("plan #{}", subscription.membership_id), |m| m.name.clone());
    let state = if subscription.is_active { "active" } else { "inactive" };
    println!(
        "Client #{client_id}: {plan} ({state}, {} to {})",
        subscription.start_date, subscription.end_date
    );
    Ok(())
}

pub async fn subscribe(
    gym: &GymClient,
    client_id: i64,
    membership_id: i64,
    start: Option<String>,
) -> Result<()> {
    let start_date = start
        .map(|raw| {
            NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                .with_context(|| format!("'{raw}' is not a date (use YYYY-MM-DD)"))
        })
        .transpose()?;

    let request = NewSubscription {
        membership_id,
        start_date,
    };
    let subscription = gym
        .clients()
        .create_subscription(client_id, &request)
        .await?;
    display::success(&format!(
        "Subscription opened: {} to {}",
        subscription.start_date, subscription.end_date
    ));
    Ok(())
}

pub async fn unsubscribe(gym: &GymClient, client_id: i64) -> Result<()> {
    let status = gym.clients().deactivate_subscription(client_id).await?;
    display::success(status.message.as_deref().unwrap_or("Subscription closed"));
    Ok(())
}

pub async fn catalog_genders(gym: &GymClient) -> Result<()> {
    let genders = gym.catalog().genders().await?;
    display::named_rows("Genders", genders.iter().map(|g| (g.id, g.name.as_str())));
    Ok(())
}

pub async fn catalog_blood_types(gym: &GymClient) -> Result<()> {
    let blood_types = gym.catalog().blood_types().await?;
    display::named_rows(
        "Blood types",
        blood_types.iter().map(|b| (b.id, b.name.as_str())),
    );
    Ok(())
}

pub async fn catalog_states(gym: &GymClient) -> Result<()> {
    let states = gym.catalog().states().await?;
    display::named_rows("States", states.iter().map(|s| (s.id, s.name.as_str())));
    Ok(())
}

pub async fn catalog_goals(gym: &GymClient) -> Result<()> {
    let goals = gym.catalog().client_goals().await?;
    display::named_rows("Goals", goals.iter().map(|g| (g.id, g.name.as_str())));
    Ok(())
}

pub async fn catalog_memberships(gym: &GymClient) -> Result<()> {
    let memberships = gym.catalog().memberships().await?;
    display::membership_table(&memberships);
    Ok(())
}

pub async fn catalog_add_gender(gym: &GymClient, name: String) -> Result<()> {
    let gender = gym.catalog().create_gender(&name).await?;
    display::success(&format!("Added gender #{} ({})", gender.id, gender.name));
    Ok(())
}

pub async fn catalog_add_blood_type(gym: &GymClient, name: String) -> Result<()> {
    let blood_type = gym.catalog().create_blood_type(&name).await?;
    display::success(&format!(
        "Added blood type #{} ({})",
        blood_type.id, blood_type.name
    ));
    Ok(())
}

pub async fn catalog_add_state(gym: &GymClient, name: String) -> Result<()> {
    let state = gym.catalog().create_state(&name).await?;
    display::success(&format!("Added state #{} ({})", state.id, state.name));
    Ok(())
}

pub async fn catalog_add_membership(
    gym: &GymClient,
    name: String,
    price: f64,
    duration: u32,
    description: Option<String>,
) -> Result<()> {
    let request = NewMembership {
        name,
        description,
        price,
        duration,
    };
    let membership = gym.catalog().create_membership(&request).await?;
    display::success(&format!(
        "Added membership #{} ({})",
        membership.id, membership.name
    ));
    Ok(())
}

pub async fn catalog_edit_membership(
    gym: &GymClient,
    id: i64,
    name: String,
    price: f64,
    duration: u32,
    description: Option<String>,
) -> Result<()> {
    let request = NewMembership {
        name,
        description,
        price,
        duration,
    };
    let membership = gym.catalog().update_membership(id, &request).await?;
    display::success(&format!("Updated membership #{}", membership.id));
    Ok(())
}

pub async fn catalog_remove_membership(gym: &GymClient, id: i64) -> Result<()> {
    gym.catalog().delete_membership(id).await?;
    display::success(&format!("Removed membership #{id}"));
    Ok(())
}

/// Walk the paginated list until the record shows up or pages run out.
///
/// The backend has no fetch-one endpoint; the editor works from the same
/// listing the table view uses.
async fn find_record(gym: &GymClient, id: i64) -> Result<Option<ClientRecord>> {
    let mut page_number = 1;
    loop {
        log::debug!("scanning page {page_number} for client {id}");
        let page = gym
            .clients()
            .list(&PageQuery::new().with_page(page_number).with_quantity(50))
            .await?;
        if let Some(record) = page.data.into_iter().find(|r| r.id == id) {
            return Ok(Some(record));
        }
        if !page.has_more {
            return Ok(None);
        }
        page_number += 1;
    }
}

/// Load the reference data the form offers as choices.
///
/// The three loads run concurrently and fail independently: genders and
/// blood types are required (the backend will reject a record without
/// them), goals degrade to an empty choice list.
async fn load_catalogs(
    gym: &GymClient,
) -> Result<(Vec<Gender>, Vec<BloodType>, Vec<ClientGoal>)> {
    let (genders, blood_types, goals) = tokio::join!(
        gym.catalog().genders(),
        gym.catalog().blood_types(),
        gym.catalog().client_goals()
    );

    let genders = genders.context("failed to load genders")?;
    let blood_types = blood_types.context("failed to load blood types")?;
    let goals = match goals {
        Ok(goals) => goals,
        Err(e) => {
            display::warning(&format!("could not load goals: {e}"));
            Vec::new()
        }
    };
    Ok((genders, blood_types, goals))
}

/// Drive the interactive form until it validates.
///
/// Every pass re-prompts each field pre-filled with its current value (so
/// accepting the default means pressing enter), then runs validation and
/// prints one inline message per broken field.
async fn run_client_form(gym: &GymClient, form: &mut ClientForm) -> Result<ValidatedClient> {
    let (genders, blood_types, goals) = load_catalogs(gym).await?;
    let mut rl = DefaultEditor::new()?;

    loop {
        prompt_fields(&mut rl, form, &genders, &blood_types, &goals)?;
        edit_observations(&mut rl, form)?;

        match form.validate() {
            Ok(valid) => return Ok(valid),
            Err(errors) => {
                print_field_errors(&errors);
                println!("Fix the fields above.\n");
            }
        }
    }
}

fn print_field_errors(errors: &[FieldError]) {
    for error in errors {
        eprintln!("  {} {}", format!("{}:", error.field).red().bold(), error.message);
    }
}

fn prompt(rl: &mut DefaultEditor, label: &str, initial: &str) -> Result<String> {
    let line = rl.readline_with_initial(&format!("{label}: "), (initial, ""))?;
    Ok(line.trim().to_string())
}

fn prompt_reference(
    rl: &mut DefaultEditor,
    label: &str,
    current: Option<i64>,
) -> Result<Option<i64>> {
    let initial = current.map(|id| id.to_string()).unwrap_or_default();
    let raw = prompt(rl, label, &initial)?;
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<i64>() {
        Ok(id) => Ok(Some(id)),
        Err(_) => {
            display::warning(&format!("'{raw}' is not an id"));
            Ok(current)
        }
    }
}

fn prompt_fields(
    rl: &mut DefaultEditor,
    form: &mut ClientForm,
    genders: &[Gender],
    blood_types: &[BloodType],
    goals: &[ClientGoal],
) -> Result<()> {
    form.fields.name = prompt(rl, "name", &form.fields.name.clone())?;
    form.fields.last_name = prompt(rl, "last name", &form.fields.last_name.clone())?;
    form.fields.document_number =
        prompt(rl, "document number", &form.fields.document_number.clone())?;
    form.fields.email = prompt(rl, "email", &form.fields.email.clone())?;
    form.fields.phone_number = prompt(rl, "phone (optional)", &form.fields.phone_number.clone())?;
    form.fields.address = prompt(rl, "address (optional)", &form.fields.address.clone())?;
    form.fields.birth_date =
        prompt(rl, "birth date (YYYY-MM-DD)", &form.fields.birth_date.clone())?;
    form.fields.registration_date = prompt(
        rl,
        "registration date (optional)",
        &form.fields.registration_date.clone(),
    )?;

    display::named_rows("Genders", genders.iter().map(|g| (g.id, g.name.as_str())));
    form.fields.gender_id = prompt_reference(rl, "gender id", form.fields.gender_id)?;

    display::named_rows(
        "Blood types",
        blood_types.iter().map(|b| (b.id, b.name.as_str())),
    );
    form.fields.blood_type_id = prompt_reference(rl, "blood type id", form.fields.blood_type_id)?;

    if !goals.is_empty() {
        display::named_rows("Goals", goals.iter().map(|g| (g.id, g.name.as_str())));
        form.fields.client_goal_id =
            prompt_reference(rl, "goal id (optional)", form.fields.client_goal_id)?;
    }

    Ok(())
}

/// The observation sub-form: list, add, edit, delete, done.
fn edit_observations(rl: &mut DefaultEditor, form: &mut ClientForm) -> Result<()> {
    loop {
        if form.observations().is_empty() {
            println!("\nNo observations.");
        } else {
            println!("\nObservations:");
            for draft in form.observations() {
                println!(
                    "  [{}] {} ({}): {}",
                    draft.draft_id, draft.title.bold(), draft.date, draft.description
                );
            }
        }

        let line = rl.readline("observations (a=add, e <n>=edit, d <n>=delete, enter=done): ")?;
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let mut parts = line.splitn(2, char::is_whitespace);
        let action = parts.next().unwrap_or_default();
        let argument = parts.next().unwrap_or_default();
        match (action, argument.trim().parse::<u32>()) {
            ("a", _) => {
                let title = prompt(rl, "  title", "")?;
                let description = prompt(rl, "  description", "")?;
                let date = prompt_observation_date(rl, "")?;
                if let Err(error) = form.add_observation(&title, &description, date) {
                    print_field_errors(&[error]);
                }
            }
            ("e", Ok(draft_id)) => {
                let Some(draft) = form.begin_observation_edit(draft_id) else {
                    display::warning(&format!("no observation [{draft_id}]"));
                    continue;
                };
                let (initial_title, initial_description, initial_date) = (
                    draft.title.clone(),
                    draft.description.clone(),
                    draft.date.format("%Y-%m-%d").to_string(),
                );
                let title = prompt(rl, "  title", &initial_title)?;
                let description = prompt(rl, "  description", &initial_description)?;
                let date = prompt_observation_date(rl, &initial_date)?;
                if let Err(error) = form.apply_observation_edit(&title, &description, date) {
                    print_field_errors(&[error]);
                    form.cancel_observation_edit();
                }
            }
            ("d", Ok(draft_id)) => {
                if !form.remove_observation(draft_id) {
                    display::warning(&format!("no observation [{draft_id}]"));
                }
            }
            _ => display::warning("unknown action"),
        }
    }
}

fn prompt_observation_date(rl: &mut DefaultEditor, initial: &str) -> Result<NaiveDate> {
    loop {
        let raw = prompt(rl, "  date (YYYY-MM-DD, enter for today)", initial)?;
        if raw.is_empty() {
            return Ok(chrono::Local::now().date_naive());
        }
        match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
            Ok(date) => return Ok(date),
            Err(_) => display::warning("not a valid date"),
        }
    }
}

/// Guard for commands that need a session up front.
///
/// Purely a fast local check; the transport still handles a token that
/// expires mid-flight.
pub fn require_session(gym: &GymClient) -> Result<()> {
    if gym.auth().is_authenticated() {
        return Ok(());
    }
    bail!("Not signed in. Run `gymdesk login` first.");
}
