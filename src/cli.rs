use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Args, Parser, Subcommand};

use crate::ui::OutputFormat;
use crate::user::{DesiredState, UserProfile};

/// Manage Proxmox VE users through the cluster API
#[derive(Parser, Debug)]
#[command(name = "pve-user", author, version, about, long_about = None)]
pub struct Cli {
    /// Print debug events and record API calls to the log
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format
    #[arg(long, value_enum, global = true, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create, update or delete a user so it matches the given state
    Apply(ApplyArgs),

    /// Show or clear the API call log written in debug mode
    Log(LogArgs),
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub user: UserArgs,

    /// Report what would change without touching the cluster
    #[arg(long, visible_alias = "dry-run")]
    pub check: bool,
}

#[derive(Args, Debug, Default)]
pub struct ConnectionArgs {
    /// Connection config file [default: ~/.config/pve-user/config.toml]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Proxmox VE host
    #[arg(long, env = "PROXMOX_HOST")]
    pub api_host: Option<String>,

    /// API port [default: 8006]
    #[arg(long, env = "PROXMOX_PORT")]
    pub api_port: Option<u16>,

    /// User to authenticate as, e.g. root@pam
    #[arg(long, env = "PROXMOX_USER")]
    pub api_user: Option<String>,

    /// Password for ticket authentication
    #[arg(long, env = "PROXMOX_PASSWORD", hide_env_values = true)]
    pub api_password: Option<String>,

    /// API token ID (without the user part)
    #[arg(long, env = "PROXMOX_TOKEN_ID")]
    pub api_token_id: Option<String>,

    /// API token secret
    #[arg(long, env = "PROXMOX_TOKEN_SECRET", hide_env_values = true)]
    pub api_token_secret: Option<String>,

    /// Verify the server's TLS certificate [default: false]
    #[arg(
        long,
        env = "PROXMOX_VALIDATE_CERTS",
        num_args = 0..=1,
        default_missing_value = "true",
        value_parser = BoolishValueParser::new()
    )]
    pub validate_certs: Option<bool>,

    /// Request timeout in seconds [default: 30]
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct UserArgs {
    /// User ID including the authentication realm, e.g. alice@pve
    #[arg(long = "userid", visible_alias = "name", value_name = "USER@REALM")]
    pub userid: String,

    /// Desired state of the user
    #[arg(long, value_enum, default_value_t = DesiredState::Present)]
    pub state: DesiredState,

    /// Description of the user
    #[arg(long)]
    pub comment: Option<String>,

    /// Email address
    #[arg(long)]
    pub email: Option<String>,

    /// Whether the account is active
    #[arg(long, default_value_t = true, action = ArgAction::Set, value_parser = BoolishValueParser::new())]
    pub enable: bool,

    /// Expiration date in seconds after epoch, 0 means no expiration
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..))]
    pub expire: i64,

    /// First name
    #[arg(long)]
    pub firstname: Option<String>,

    /// Last name
    #[arg(long)]
    pub lastname: Option<String>,

    /// Groups the user is a member of (comma separated or repeated)
    #[arg(long, value_delimiter = ',')]
    pub groups: Option<Vec<String>>,

    /// Keys for two factor authentication (yubico)
    #[arg(long)]
    pub keys: Option<String>,

    /// Initial password, PVE realm only; re-applied on every run when given
    #[arg(long)]
    pub password: Option<String>,
}

impl UserArgs {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            comment: self.comment.clone(),
            email: self.email.clone(),
            enable: self.enable,
            expire: self.expire,
            firstname: self.firstname.clone(),
            lastname: self.lastname.clone(),
            groups: self.groups.clone(),
            keys: self.keys.clone(),
            password: self.password.clone(),
        }
    }
}

#[derive(Args, Debug)]
pub struct LogArgs {
    /// Number of entries to show
    #[arg(short = 'n', long, default_value_t = 10)]
    pub limit: usize,

    /// Delete the log instead of showing it
    #[arg(long)]
    pub clear: bool,
}
