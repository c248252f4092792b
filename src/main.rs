use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use serde_json::json;
use time::PrimitiveDateTime;

use donatify::api::types::{
    ActivityDraft, AdminUserUpdate, EnrollmentStatus, OngDraft, PasswordChange, ProfileUpdate, RegisterRequest,
};
use donatify::api::ApiError;
use donatify::config::ConfigError;
use donatify::router::{ScreenGroup, select_screen_group};
use donatify::storage::{FileTokenStore, TokenStore};
use donatify::validation::{
    ValidationError, format_local_timestamp, parse_local_timestamp, validate_activity, validate_ong,
    validate_password_change, validate_profile_update, validate_registration,
};
use donatify::{ApiClient, ClientConfig, SessionError, SessionState, SessionStore};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("not signed in; run `donatify login` first")]
    NotSignedIn,
    #[error("this command requires an administrator account")]
    AdminRequired,
    #[error("nothing to update; pass at least one field")]
    EmptyUpdate,
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "donatify", about = "Donatify volunteering API client")]
struct Cli {
    #[arg(long, env = "DONATIFY_BASE_URL")]
    base_url: Option<String>,

    /// Where the session record (token and email) is kept.
    #[arg(long, env = "DONATIFY_STORE_PATH")]
    store_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "DONATIFY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    Logout,
    /// Hydrate the persisted session and print it with the screen group it routes to.
    Whoami,
    Reload,
    Register(RegisterArgs),
    Profile(ProfileCommand),
    Dashboard,
    Activities(ActivitiesCommand),
    Enrollments,
    Ranking,
    Admin(AdminCommand),
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    nickname: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "DONATIFY_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long, default_value = "")]
    phone: String,
    #[arg(long, default_value = "")]
    address: String,
}

#[derive(Args, Debug)]
struct ProfileCommand {
    #[command(subcommand)]
    command: ProfileSubcommand,
}

#[derive(Subcommand, Debug)]
enum ProfileSubcommand {
    Update {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    Password {
        #[arg(long)]
        current: String,
        #[arg(long)]
        new: String,
    },
}

#[derive(Args, Debug)]
struct ActivitiesCommand {
    #[command(subcommand)]
    command: ActivitiesSubcommand,
}

#[derive(Subcommand, Debug)]
enum ActivitiesSubcommand {
    List,
    Enroll { activity_id: i64 },
}

#[derive(Args, Debug)]
struct AdminCommand {
    #[command(subcommand)]
    command: AdminSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminSubcommand {
    Activities(AdminActivitiesCommand),
    Users(AdminUsersCommand),
    Ongs(AdminOngsCommand),
    Enrollments(AdminEnrollmentsCommand),
}

#[derive(Args, Debug)]
struct AdminActivitiesCommand {
    #[command(subcommand)]
    command: AdminActivitiesSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminActivitiesSubcommand {
    List,
    Create(ActivityArgs),
    Update {
        id: i64,
        #[command(flatten)]
        activity: ActivityArgs,
    },
    Delete { id: i64 },
}

#[derive(Args, Debug)]
struct ActivityArgs {
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    location: String,
    #[arg(long = "type", default_value = "EVENT")]
    kind: String,
    #[arg(long, default_value = "ACTIVE")]
    status: String,
    #[arg(long, default_value_t = 0)]
    points: i64,
    /// Local timestamp, `YYYY-MM-DDTHH:MM:SS`.
    #[arg(long, value_parser = timestamp_arg)]
    start: PrimitiveDateTime,
    #[arg(long, value_parser = timestamp_arg)]
    end: PrimitiveDateTime,
}

fn timestamp_arg(raw: &str) -> Result<PrimitiveDateTime, ValidationError> {
    parse_local_timestamp("timestamp", raw)
}

impl ActivityArgs {
    fn into_draft(self, id: Option<i64>) -> ActivityDraft {
        ActivityDraft {
            id,
            title: self.title,
            description: self.description,
            location: self.location,
            kind: self.kind,
            status: self.status,
            points_value: self.points,
            start_date: format_local_timestamp(self.start),
            end_date: format_local_timestamp(self.end),
        }
    }
}

#[derive(Args, Debug)]
struct AdminUsersCommand {
    #[command(subcommand)]
    command: AdminUsersSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminUsersSubcommand {
    List,
    Update {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        email: String,
    },
    Delete { id: i64 },
}

#[derive(Args, Debug)]
struct AdminOngsCommand {
    #[command(subcommand)]
    command: AdminOngsSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminOngsSubcommand {
    List,
    Create {
        #[arg(long)]
        name: String,
    },
    Update {
        id: i64,
        #[arg(long)]
        name: String,
    },
    Delete { id: i64 },
}

#[derive(Args, Debug)]
struct AdminEnrollmentsCommand {
    #[command(subcommand)]
    command: AdminEnrollmentsSubcommand,
}

#[derive(Subcommand, Debug)]
enum AdminEnrollmentsSubcommand {
    List {
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
    },
    /// Approve an enrollment and award its points.
    Complete { id: i64 },
    Cancel { id: i64 },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StatusFilter {
    Enrolled,
    Completed,
    Canceled,
}

impl From<StatusFilter> for EnrollmentStatus {
    fn from(filter: StatusFilter) -> Self {
        match filter {
            StatusFilter::Enrolled => Self::Enrolled,
            StatusFilter::Completed => Self::Completed,
            StatusFilter::Canceled => Self::Canceled,
        }
    }
}

// =============================================================================
// ENTRY
// =============================================================================

struct App {
    api: Arc<ApiClient>,
    session: SessionStore,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    // Before parsing, so clap's env fallbacks see values from .env.
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config = config.with_base_url(base_url)?;
    }
    if let Some(store_path) = cli.store_path {
        config.store_path = store_path;
    }

    let store: Arc<dyn TokenStore> = Arc::new(FileTokenStore::new(config.store_path.clone()));
    let api = Arc::new(ApiClient::new(&config, store.clone())?);
    let session = SessionStore::new(api.clone(), store);
    tracing::debug!(base_url = %api.base_url(), store = %config.store_path.display(), "client ready");

    let mut app = App { api, session };
    app.run(cli.command).await
}

impl App {
    async fn run(&mut self, command: Command) -> Result<(), CliError> {
        match command {
            Command::Login { email, password } => {
                let user = self.session.login(&email, &password).await?;
                let group = select_screen_group(&self.session.state());
                print_json(&json!({ "user": user, "screenGroup": group }))
            }
            Command::Logout => {
                self.session.logout().await;
                println!("logged out");
                Ok(())
            }
            Command::Whoami => {
                let state = self.session.bootstrap().await;
                print_session(&state)
            }
            Command::Reload => {
                let user = self.session.reload().await?;
                print_json(&user)
            }
            Command::Register(args) => self.register(args).await,
            Command::Profile(profile) => self.run_profile(profile.command).await,
            Command::Dashboard => {
                self.require_member().await?;
                print_json(&self.api.dashboard().await?)
            }
            Command::Activities(activities) => {
                self.require_member().await?;
                match activities.command {
                    ActivitiesSubcommand::List => print_json(&self.api.activities().await?),
                    ActivitiesSubcommand::Enroll { activity_id } => print_json(&self.api.enroll(activity_id).await?),
                }
            }
            Command::Enrollments => {
                self.require_member().await?;
                print_json(&self.api.my_enrollments().await?)
            }
            Command::Ranking => {
                self.require_member().await?;
                print_json(&self.api.ranking().await?)
            }
            Command::Admin(admin) => {
                self.require_admin().await?;
                self.run_admin(admin.command).await
            }
        }
    }

    async fn register(&self, args: RegisterArgs) -> Result<(), CliError> {
        let request = RegisterRequest {
            name: args.name,
            nickname: args.nickname,
            email: args.email,
            password: args.password,
            phone: args.phone,
            address: args.address,
        };
        validate_registration(&request)?;
        let profile = self.api.register(&request).await?;
        tracing::info!(user_id = profile.id, "account created");
        print_json(&profile)
    }

    async fn run_profile(&mut self, command: ProfileSubcommand) -> Result<(), CliError> {
        match command {
            ProfileSubcommand::Update {
                name,
                nickname,
                phone,
                address,
            } => {
                let update = ProfileUpdate {
                    name,
                    nickname,
                    phone,
                    address,
                };
                if update == ProfileUpdate::default() {
                    return Err(CliError::EmptyUpdate);
                }
                validate_profile_update(&update)?;
                self.require_member().await?;
                self.api.update_profile(&update).await?;
                // Re-fetch through the session so the cached identity matches the server.
                let user = self.session.reload().await?;
                print_json(&user)
            }
            ProfileSubcommand::Password { current, new } => {
                let change = PasswordChange {
                    current_password: current,
                    new_password: new,
                };
                validate_password_change(&change)?;
                self.require_member().await?;
                self.api.change_password(&change).await?;
                println!("password changed");
                Ok(())
            }
        }
    }

    async fn run_admin(&self, command: AdminSubcommand) -> Result<(), CliError> {
        match command {
            AdminSubcommand::Activities(activities) => match activities.command {
                AdminActivitiesSubcommand::List => print_json(&self.api.admin_activities().await?),
                AdminActivitiesSubcommand::Create(activity) => {
                    let draft = activity.into_draft(None);
                    validate_activity(&draft)?;
                    print_json(&self.api.create_activity(&draft).await?)
                }
                AdminActivitiesSubcommand::Update { id, activity } => {
                    let draft = activity.into_draft(Some(id));
                    validate_activity(&draft)?;
                    print_json(&self.api.update_activity(id, &draft).await?)
                }
                AdminActivitiesSubcommand::Delete { id } => {
                    self.api.delete_activity(id).await?;
                    print_json(&json!({ "deleted": id }))
                }
            },
            AdminSubcommand::Users(users) => match users.command {
                AdminUsersSubcommand::List => print_json(&self.api.admin_users().await?),
                AdminUsersSubcommand::Update {
                    id,
                    name,
                    nickname,
                    email,
                } => {
                    let update = AdminUserUpdate { name, nickname, email };
                    print_json(&self.api.update_user(id, &update).await?)
                }
                AdminUsersSubcommand::Delete { id } => {
                    self.api.delete_user(id).await?;
                    print_json(&json!({ "deleted": id }))
                }
            },
            AdminSubcommand::Ongs(ongs) => match ongs.command {
                AdminOngsSubcommand::List => print_json(&self.api.admin_ongs().await?),
                AdminOngsSubcommand::Create { name } => {
                    let draft = OngDraft { name };
                    validate_ong(&draft)?;
                    print_json(&self.api.create_ong(&draft).await?)
                }
                AdminOngsSubcommand::Update { id, name } => {
                    let draft = OngDraft { name };
                    validate_ong(&draft)?;
                    print_json(&self.api.update_ong(id, &draft).await?)
                }
                AdminOngsSubcommand::Delete { id } => {
                    self.api.delete_ong(id).await?;
                    print_json(&json!({ "deleted": id }))
                }
            },
            AdminSubcommand::Enrollments(enrollments) => match enrollments.command {
                AdminEnrollmentsSubcommand::List { status } => {
                    let list = self.api.admin_enrollments(status.map(Into::into)).await?;
                    print_json(&list)
                }
                AdminEnrollmentsSubcommand::Complete { id } => print_json(&self.api.complete_enrollment(id).await?),
                AdminEnrollmentsSubcommand::Cancel { id } => print_json(&self.api.cancel_enrollment(id).await?),
            },
        }
    }

    /// Hydrate and return the mounted group, failing when nothing is signed in.
    async fn require_member(&mut self) -> Result<ScreenGroup, CliError> {
        let state = self.session.bootstrap().await;
        match select_screen_group(&state) {
            ScreenGroup::Loading | ScreenGroup::Unauthenticated => Err(CliError::NotSignedIn),
            group => Ok(group),
        }
    }

    async fn require_admin(&mut self) -> Result<(), CliError> {
        match self.require_member().await? {
            ScreenGroup::Admin => Ok(()),
            _ => Err(CliError::AdminRequired),
        }
    }
}

fn print_session(state: &SessionState) -> Result<(), CliError> {
    let group = select_screen_group(state);
    print_json(&json!({
        "session": state,
        "screenGroup": group,
        "initialScreen": group.initial_screen(),
        "screens": group.screens(),
    }))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
