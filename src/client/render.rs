//! Plain-text rendering of the views for the terminal front end.

use std::fmt::Write;

use time::{format_description::FormatItem, macros::format_description};

use crate::{
    client::{
        list::{ListController, ViewState},
        pagination::{page_window, PageItem},
    },
    users::model::User,
};

const CREATED_AT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Absolute address of a stored profile image, or `N/A` when there is none.
pub fn profile_url(asset_base: &str, profile: &str) -> String {
    if profile.is_empty() {
        return "N/A".to_string();
    }
    format!(
        "{}/{}",
        asset_base.trim_end_matches('/'),
        profile.trim_start_matches('/')
    )
}

pub fn pagination_bar(current: u64, total_pages: u64) -> String {
    let mut out = String::new();
    out.push_str(if current > 1 { "< " } else { "  " });
    for item in page_window(current, total_pages) {
        match item {
            PageItem::Page { number, current: true } => {
                let _ = write!(out, "[{}] ", number);
            }
            PageItem::Page { number, .. } => {
                let _ = write!(out, "{} ", number);
            }
            PageItem::Ellipsis => out.push_str("... "),
        }
    }
    if current < total_pages {
        out.push('>');
    }
    out.trim().to_string()
}

pub fn list_view(list: &ListController) -> String {
    let mut out = String::new();
    if !list.search().is_empty() {
        let _ = writeln!(out, "search: {}", list.search());
    }
    match list.state() {
        ViewState::Idle | ViewState::Loading => out.push_str("Loading...\n"),
        ViewState::Error => out.push_str("Could not load users.\n"),
        ViewState::Empty => out.push_str("No users found.\n"),
        ViewState::Loaded => {
            let _ = writeln!(
                out,
                "{:>4}  {:<24} {:<28} {:<8} {:<10} {}",
                "#", "Full Name", "Email", "Gender", "Status", "Id"
            );
            let first = list.paging().first_row_number();
            for (i, user) in list.users().iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{:>4}  {:<24} {:<28} {:<8} {:<10} {}",
                    first + i as u64,
                    user.full_name(),
                    user.email,
                    user.gender,
                    user.status,
                    user.id
                );
            }
            let paging = list.paging();
            let _ = writeln!(
                out,
                "{}   ({} total, {} per page)",
                pagination_bar(paging.page, paging.total_pages),
                paging.total,
                paging.page_size
            );
        }
    }
    out
}

pub fn detail_view(user: &User, asset_base: &str) -> String {
    let created = user
        .created_at
        .format(CREATED_AT)
        .unwrap_or_else(|_| user.created_at.to_string());
    let rows = [
        ("Name", user.full_name()),
        ("Email", user.email.clone()),
        ("Mobile", user.mobile.clone()),
        ("Gender", user.gender.to_string()),
        ("Status", user.status.to_string()),
        ("Location", user.location.clone()),
        ("Profile", profile_url(asset_base, &user.profile)),
        ("Created", created),
    ];
    let mut out = String::new();
    for (label, value) in rows {
        let _ = writeln!(out, "{:<10} {}", label, value);
    }
    out
}
