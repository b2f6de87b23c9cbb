use std::{path::Path, sync::Arc};

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use usersdesk::{
    client::{
        api::{HttpUsersApi, ProfileFile, UsersApi},
        detail::{DetailController, DetailView},
        form::{FormController, SubmitOutcome},
        list::ListController,
        notify::{NoticeKind, Notifier},
        render,
    },
    config::ClientConfig,
};

const HELP: &str = "\
commands:
  search <text>     filter by name or email (empty clears)
  page <n> | next | prev | size <n>
  view <id>         show one user
  add               create a user
  edit <id>         edit a user
  delete <id>       delete a user
  export [dir]      download the CSV export
  list | help | quit";

type Input = Lines<BufReader<Stdin>>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    usersdesk::init_tracing("usersdesk=warn");

    let config = ClientConfig::from_env();
    let api = HttpUsersApi::new(&config.api_base_url)?;
    let notifier = Notifier::new();
    let mut list = ListController::new(api.clone(), notifier.clone(), config.page_size.into());

    list.refresh().await;
    print!("{}", render::list_view(&list));
    show_notices(&notifier);
    println!("{}", HELP);

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let Some(line) = prompt(&mut input, "> ").await? else {
            break;
        };
        let (cmd, arg) = match line.trim().split_once(' ') {
            Some((c, a)) => (c, a.trim()),
            None => (line.trim(), ""),
        };

        match cmd {
            "" => continue,
            "quit" | "exit" => break,
            "help" => {
                println!("{}", HELP);
                continue;
            }
            "list" => list.refresh().await,
            "search" => {
                list.set_search_input(arg);
                list.settle_search().await;
            }
            "page" => match arg.parse::<u64>() {
                Ok(n) => list.go_to_page(n).await,
                Err(_) => println!("usage: page <n>"),
            },
            "next" => list.next_page().await,
            "prev" => list.prev_page().await,
            "size" => match arg.parse::<u64>() {
                Ok(n) if n > 0 => list.set_page_size(n).await,
                _ => println!("usage: size <n>"),
            },
            "view" => {
                view(api.clone(), arg, &config.asset_base_url).await;
                show_notices(&notifier);
                continue;
            }
            "add" | "edit" => {
                let id = (cmd == "edit").then_some(arg).filter(|a| !a.is_empty());
                if cmd == "edit" && id.is_none() {
                    println!("usage: edit <id>");
                    continue;
                }
                if edit(api.clone(), notifier.clone(), id, &mut input).await? {
                    list.refresh().await;
                }
            }
            "delete" => {
                let answer = prompt(&mut input, &format!("Delete user {}? [y/N] ", arg)).await?;
                let yes = matches!(answer.as_deref().map(str::trim), Some("y" | "Y" | "yes"));
                list.delete(arg, || yes).await;
            }
            "export" => {
                let dir = if arg.is_empty() { "." } else { arg };
                list.export(Path::new(dir)).await;
            }
            other => {
                println!("unknown command `{}`, try `help`", other);
                continue;
            }
        }

        print!("{}", render::list_view(&list));
        show_notices(&notifier);
    }
    Ok(())
}

async fn prompt(input: &mut Input, text: &str) -> anyhow::Result<Option<String>> {
    use std::io::Write;
    print!("{}", text);
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}

fn show_notices(notifier: &Notifier) {
    for notice in notifier.drain() {
        let tag = match notice.kind {
            NoticeKind::Info => "info",
            NoticeKind::Success => "ok",
            NoticeKind::Error => "error",
        };
        println!("[{}] {}", tag, notice.text);
    }
}

async fn view(api: Arc<dyn UsersApi>, id: &str, asset_base: &str) {
    let mut detail = DetailController::new(api, id);
    match detail.load().await {
        DetailView::Loaded(user) => print!("{}", render::detail_view(user, asset_base)),
        DetailView::Failed(message) => println!("{}\n(back to list)", message),
        DetailView::Loading => {}
    }
    if let Some(id) = detail.edit_target() {
        println!("edit with: edit {}", id);
    }
}

/// Walks through the form fields. Returns whether a record was saved.
async fn edit(
    api: Arc<dyn UsersApi>,
    notifier: Notifier,
    id: Option<&str>,
    input: &mut Input,
) -> anyhow::Result<bool> {
    let mut form = match FormController::open(api, notifier.clone(), id).await {
        Ok(form) => form,
        Err(e) => {
            notifier.error(e.server_message().unwrap_or("Failed to fetch user details").to_string());
            return Ok(false);
        }
    };
    println!("{} (enter keeps the current value)", form.title());

    let fields = [
        ("firstName", "First name"),
        ("lastName", "Last name"),
        ("email", "Email"),
        ("mobile", "Mobile"),
        ("gender", "Gender (Male/Female/Other)"),
        ("status", "Status (Active/Inactive)"),
        ("location", "Location"),
    ];

    loop {
        for (name, label) in fields {
            loop {
                let current = current_value(&form, name);
                let Some(answer) = prompt(input, &format!("{} [{}]: ", label, current)).await?
                else {
                    return Ok(false);
                };
                let answer = answer.trim();
                if answer.is_empty() {
                    break;
                }
                match form.set_field(name, answer) {
                    Ok(()) => break,
                    Err(e) => println!("{}", e),
                }
            }
        }

        let existing = form.existing_profile().to_string();
        let label = if existing.is_empty() {
            "Profile image path (optional): ".to_string()
        } else {
            format!("Profile image path (current {}): ", existing)
        };
        if let Some(path) = prompt(input, &label).await? {
            let path = path.trim();
            if !path.is_empty() {
                match read_profile(Path::new(path)).await {
                    Ok(file) => form.attach_profile(file),
                    Err(e) => println!("{:#}", e),
                }
            }
        }

        match form.submit().await {
            SubmitOutcome::Saved(_) => return Ok(true),
            SubmitOutcome::Invalid => {
                for message in form.errors().values() {
                    println!("  {}", message);
                }
            }
            SubmitOutcome::Failed(_) => {
                show_notices(&notifier);
                return Ok(false);
            }
        }
    }
}

fn current_value(form: &FormController, name: &str) -> String {
    let d = form.draft();
    match name {
        "firstName" => d.first_name.clone(),
        "lastName" => d.last_name.clone(),
        "email" => d.email.clone(),
        "mobile" => d.mobile.clone(),
        "gender" => d.gender.to_string(),
        "status" => d.status.to_string(),
        "location" => d.location.clone(),
        _ => String::new(),
    }
}

async fn read_profile(path: &Path) -> anyhow::Result<ProfileFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("profile")
        .to_string();
    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some("png") => Some("image/png"),
        Some("jpg" | "jpeg") => Some("image/jpeg"),
        Some("gif") => Some("image/gif"),
        Some("webp") => Some("image/webp"),
        _ => None,
    };
    Ok(ProfileFile {
        file_name,
        content_type: content_type.map(str::to_string),
        bytes,
    })
}
