//! Russian Town hub command line
//!
//! Drives the same views as the website: every command activates a page,
//! performs at most one action and prints the resulting state and notices.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use rtown_hub::config::Config;
use rtown_hub::loader::{CollectionName, LoadStatus};
use rtown_hub::models::{FactionType, NewFaction, PostDraft, PostFilter, PostType, UserFlag};
use rtown_hub::view::{
    pages, redirect_for, Activation, NoticeLevel, RegistrationForm, ViewCoordinator,
};
use rtown_hub::AppContext;

#[derive(Parser)]
#[command(name = "rtown", about = "Russian Town community hub client")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the session
    Login {
        username: String,
        #[arg(long, env = "RTOWN_PASSWORD")]
        password: String,
    },
    /// Create an account
    Register {
        username: String,
        #[arg(long, env = "RTOWN_PASSWORD")]
        password: String,
        #[arg(long)]
        confirm: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Forget the saved session
    Logout,
    /// Show the saved identity
    Whoami,
    /// Set the avatar URL on the saved identity
    Avatar { url: String },
    /// Forum posts
    #[command(subcommand)]
    Forum(ForumCommand),
    /// Factions grouped by type
    Factions,
    /// Admin panel
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand)]
enum ForumCommand {
    /// List posts
    List {
        /// general, complaint, application or announcement
        #[arg(long = "type")]
        kind: Option<String>,
    },
    /// Create a post
    Post {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long = "type", default_value = "general")]
        kind: String,
    },
}

#[derive(Subcommand)]
enum AdminCommand {
    Users,
    Factions,
    Stats,
    /// Toggle a user's ban
    Ban { user_id: i64 },
    /// Toggle a user's mute
    Mute { user_id: i64 },
    /// Toggle a user's admin rights
    Op { user_id: i64 },
    /// Open or close a faction
    Open {
        faction_id: i64,
        #[arg(action = clap::ArgAction::Set)]
        is_open: bool,
    },
    /// Change a faction's type
    FactionType { faction_id: i64, kind: String },
    /// Set a faction's general
    General { faction_id: i64, username: String },
    /// Set a statistic value
    Stat { key: String, value: String },
    /// Create a faction
    NewFaction {
        name: String,
        #[arg(long = "type", default_value = "open")]
        kind: String,
        #[arg(long)]
        closed: bool,
        #[arg(long, default_value = "")]
        description: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config = Config::from_env();

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Storage path: {:?}", config.storage_path);
    tracing::debug!("API endpoints: {:?}", config.endpoints);

    let ctx = match AppContext::bootstrap(&config).await {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("error: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let view = ViewCoordinator::new(ctx);

    let ok = run(&view, args.command).await;
    print_notices(&view);

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

async fn run(view: &ViewCoordinator, command: Command) -> bool {
    match command {
        Command::Login { username, password } => {
            view.activate(&pages::LOGIN).await;
            view.login(&username, &password).await.is_ok()
        }
        Command::Register {
            username,
            password,
            confirm,
            email,
        } => {
            view.activate(&pages::REGISTER).await;
            view.register(RegistrationForm {
                username,
                email,
                password,
                confirm_password: confirm,
            })
            .await
            .is_ok()
        }
        Command::Logout => view.logout().await.is_ok(),
        Command::Whoami => match view.activate(&pages::PROFILE).await {
            Activation::Ready {
                identity: Some(identity),
                ..
            } => {
                println!("{} (#{})", identity.username, identity.id);
                println!("Role: {}", identity.role_label());
                if let Some(status) = &identity.status {
                    println!("Status: {}", status);
                }
                if let Some(avatar) = &identity.avatar_url {
                    println!("Avatar: {}", avatar);
                }
                true
            }
            other => redirected(other),
        },
        Command::Avatar { url } => match view.activate(&pages::PROFILE).await {
            Activation::Ready { .. } => view.save_avatar(&url).await.is_ok(),
            other => redirected(other),
        },
        Command::Forum(command) => run_forum(view, command).await,
        Command::Factions => {
            view.activate(&pages::FACTIONS).await;
            let Some(groups) = view.faction_groups() else {
                return false;
            };
            for (title, factions) in [
                ("State", &groups.open),
                ("Criminal", &groups.criminal),
                ("Closed", &groups.closed),
            ] {
                println!("{} ({})", title, factions.len());
                for f in factions {
                    let general = f.general_username.as_deref().unwrap_or("-");
                    let open = if f.is_open { "open" } else { "closed" };
                    println!("  #{:<4} {:<24} {:<7} general: {}", f.id, f.name, open, general);
                }
            }
            true
        }
        Command::Admin(command) => match view.activate(&pages::ADMIN).await {
            Activation::Ready { .. } => run_admin(view, command).await,
            other => redirected(other),
        },
    }
}

async fn run_forum(view: &ViewCoordinator, command: ForumCommand) -> bool {
    match command {
        ForumCommand::List { kind } => {
            let filter = kind
                .map(|k| PostFilter::Only(PostType::parse(&k)))
                .unwrap_or_default();
            view.activate_filtered(&pages::FORUM, Some(filter)).await;
            let Some(posts) = view.posts() else {
                return false;
            };
            if posts.is_empty() {
                println!("No posts yet");
            }
            for post in posts {
                let date = post
                    .created_date()
                    .map(|d| d.format("%d.%m.%Y").to_string())
                    .unwrap_or_default();
                println!(
                    "#{} [{}] {} by {} {}",
                    post.id,
                    post.post_type.label(),
                    post.title,
                    post.author_username.as_deref().unwrap_or("?"),
                    date
                );
                println!("    {}", post.content);
            }
            true
        }
        ForumCommand::Post {
            title,
            content,
            kind,
        } => {
            view.activate(&pages::FORUM).await;
            let draft = PostDraft {
                title,
                content,
                post_type: PostType::parse(&kind),
                faction_id: None,
            };
            match view.create_post(draft).await {
                Ok(created) => {
                    println!("Created post #{}", created.id);
                    true
                }
                Err(e) => {
                    if let Some(redirect) = redirect_for(&e) {
                        println!("-> {}", redirect.to.path());
                    }
                    false
                }
            }
        }
    }
}

async fn run_admin(view: &ViewCoordinator, command: AdminCommand) -> bool {
    let loader = &view.context().loader;
    match command {
        AdminCommand::Users => {
            if loader.snapshot(CollectionName::Users).status != LoadStatus::Ready {
                return false;
            }
            for u in view.users().unwrap_or_default() {
                let mut flags = Vec::new();
                if u.is_admin {
                    flags.push("admin");
                }
                if u.is_banned {
                    flags.push("banned");
                }
                if u.is_muted {
                    flags.push("muted");
                }
                println!("#{:<5} {:<20} {}", u.id, u.username, flags.join(" "));
            }
            true
        }
        AdminCommand::Factions => {
            let Some(factions) = view.factions() else {
                return false;
            };
            for f in factions {
                println!(
                    "#{:<4} {:<24} type: {:<9} open: {:<5} general: {}",
                    f.id,
                    f.name,
                    f.kind.as_str(),
                    f.is_open,
                    f.general_username.as_deref().unwrap_or("-")
                );
            }
            true
        }
        AdminCommand::Stats => {
            let Some(stats) = view.statistics() else {
                return false;
            };
            for s in stats {
                println!("{:<24} {}", s.label(), s.value);
            }
            true
        }
        AdminCommand::Ban { user_id } => view
            .toggle_user_flag(user_id, UserFlag::Banned)
            .await
            .is_ok(),
        AdminCommand::Mute { user_id } => view
            .toggle_user_flag(user_id, UserFlag::Muted)
            .await
            .is_ok(),
        AdminCommand::Op { user_id } => view
            .toggle_user_flag(user_id, UserFlag::Admin)
            .await
            .is_ok(),
        AdminCommand::Open {
            faction_id,
            is_open,
        } => view.set_faction_open(faction_id, is_open).await.is_ok(),
        AdminCommand::FactionType { faction_id, kind } => view
            .set_faction_type(faction_id, FactionType::parse(&kind))
            .await
            .is_ok(),
        AdminCommand::General {
            faction_id,
            username,
        } => {
            view.stage_general(faction_id, &username).is_ok()
                && view.commit_general(faction_id).await.is_ok()
        }
        AdminCommand::Stat { key, value } => {
            view.stage_statistic(&key, &value).is_ok()
                && view.commit_statistic(&key).await.is_ok()
        }
        AdminCommand::NewFaction {
            name,
            kind,
            closed,
            description,
        } => match view
            .create_faction(NewFaction {
                name,
                kind: FactionType::parse(&kind),
                is_open: !closed,
                description,
            })
            .await
        {
            Ok(id) => {
                println!("Created faction #{}", id);
                true
            }
            Err(_) => false,
        },
    }
}

fn redirected(activation: Activation) -> bool {
    if let Activation::Redirect(redirect) = activation {
        println!("-> {}", redirect.to.path());
    }
    false
}

fn print_notices(view: &ViewCoordinator) {
    for notice in view.context().notices.drain() {
        match notice.level {
            NoticeLevel::Success => println!("{}", notice.message),
            NoticeLevel::Error => eprintln!("{}", notice.message),
        }
    }
}
