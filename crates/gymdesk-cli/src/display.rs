//! Display utilities for CLI output formatting.

use colored::Colorize;

use gymdesk_common::{ClientRecord, Membership, Page};

/// Print a success line.
pub fn success(message: &str) {
    println!("{} {message}", "✓".green().bold());
}

/// Print a warning line.
pub fn warning(message: &str) {
    eprintln!("{} {message}", "!".yellow().bold());
}

/// Print one page of the client list as a table.
pub fn client_table(page: &Page<ClientRecord>, page_number: u32) {
    if page.data.is_empty() {
        println!("No clients on page {page_number}.");
        return;
    }

    println!(
        "{:>5}  {:<24} {:<12} {:<28} {:<12}",
        "ID".bold(),
        "Name".bold(),
        "Document".bold(),
        "Email".bold(),
        "Registered".bold()
    );
    for client in &page.data {
        println!(
            "{:>5}  {:<24} {:<12} {:<28} {:<12}",
            client.id,
            truncate(&format!("{} {}", client.name, client.last_name), 24),
            client.document_number,
            truncate(&client.email, 28),
            client.registration_date
        );
    }

    if page.has_more {
        println!(
            "\nMore results available: rerun with {}",
            format!("--page {}", page_number + 1).cyan()
        );
    }
}

/// Print one client with its relations and observations.
pub fn client_details(client: &ClientRecord) {
    println!(
        "{} {} {}",
        format!("#{}", client.id).bold(),
        client.name.bold(),
        client.last_name.bold()
    );
    println!("  document:   {}", client.document_number);
    println!("  email:      {}", client.email);
    if let Some(phone_number) = &client.phone_number {
        println!("  phone:      {phone_number}");
    }
    if let Some(address) = &client.address {
        println!("  address:    {address}");
    }
    println!("  born:       {}", client.birth_date);
    println!("  registered: {}", client.registration_date);
    if let Some(gender) = &client.gender {
        println!("  gender:     {}", gender.name);
    }
    if let Some(blood_type) = &client.blood_type {
        println!("  blood type: {}", blood_type.name);
    }
    if let Some(goal) = &client.client_goal {
        println!("  goal:       {}", goal.name);
    }

    if !client.observations.is_empty() {
        println!("  observations:");
        for observation in &client.observations {
            println!(
                "    - [{}] {}: {}",
                observation.date,
                observation.title.bold(),
                observation.description
            );
        }
    }

    for subscription in &client.subscriptions {
        let state = if subscription.is_active {
            "active".green()
        } else {
            "inactive".bright_black()
        };
        let plan = subscription
            .membership
            .as_ref()
            .map_or_else(|| format!("plan #{}", subscription.membership_id), |m| m.name.clone());
        println!(
            "  subscription: {plan} ({state}, {} to {})",
            subscription.start_date, subscription.end_date
        );
    }
}

/// Print an id/name reference table.
pub fn named_rows<'a>(title: &str, rows: impl IntoIterator<Item = (i64, &'a str)>) {
    println!("{}", title.bold());
    let mut empty = true;
    for (id, name) in rows {
        empty = false;
        println!("{id:>5}  {name}");
    }
    if empty {
        println!("  (none)");
    }
}

/// Print the membership catalog.
pub fn membership_table(memberships: &[Membership]) {
    if memberships.is_empty() {
        println!("No membership plans.");
        return;
    }
    println!(
        "{:>5}  {:<20} {:>10} {:>10}  {}",
        "ID".bold(),
        "Name".bold(),
        "Price".bold(),
        "Days".bold(),
        "Description".bold()
    );
    for membership in memberships {
        println!(
            "{:>5}  {:<20} {:>10.2} {:>10}  {}",
            membership.id,
            truncate(&membership.name, 20),
            membership.price,
            membership.duration,
            membership.description.as_deref().unwrap_or("")
        );
    }
}

fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() <= max {
        return value.to_string();
    }
    let cut: String = value.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 24), "short");
        assert_eq!(truncate("Pérez de la Cruz", 7), "Pérez …");
    }
}
