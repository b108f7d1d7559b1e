use crate::output::{print_fields, print_json};
use anyhow::Context;
use clap::{Args, Subcommand};
use std::path::{Path, PathBuf};
use vending_core::{AccountRecord, AccountSpec, SsoUser};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum AccountSubcommand {
    /// Provision a new account and wait until it is ready
    Create(SpecArgs),

    /// Show a provisioned account
    Read {
        /// Provisioned product id
        id: String,
    },

    /// Re-provision an account with new parameters
    Update {
        /// Provisioned product id
        id: String,
        #[command(flatten)]
        spec: SpecArgs,
    },

    /// Terminate the provisioned product
    Delete {
        /// Provisioned product id
        id: String,
        /// Also close the directory account and wait for suspension
        #[arg(long)]
        close: bool,
        /// Take close_on_deletion from an account spec; --close still forces closing
        #[arg(long, value_name = "FILE")]
        spec: Option<PathBuf>,
    },
}

/// Account parameters, from a YAML file or from flags.
#[derive(Args)]
pub struct SpecArgs {
    /// Read the account spec from a YAML file
    #[arg(long, value_name = "FILE")]
    spec: Option<PathBuf>,

    #[arg(long, conflicts_with = "spec")]
    name: Option<String>,

    #[arg(long, conflicts_with = "spec")]
    email: Option<String>,

    /// Slash-separated OU path, e.g. Root/Engineering/Platform
    #[arg(long, conflicts_with = "spec")]
    ou_path: Option<String>,

    /// Deprecated flat OU name; wins over --ou-path
    #[arg(long, conflicts_with = "spec")]
    ou: Option<String>,

    /// Provisioned product name (default: the account name)
    #[arg(long, conflicts_with = "spec")]
    product_name: Option<String>,

    #[arg(long, conflicts_with = "spec")]
    sso_first_name: Option<String>,

    #[arg(long, conflicts_with = "spec")]
    sso_last_name: Option<String>,

    #[arg(long, conflicts_with = "spec")]
    sso_email: Option<String>,
}

impl SpecArgs {
    fn into_spec(self) -> anyhow::Result<AccountSpec> {
        if let Some(path) = self.spec {
            return load_spec(&path);
        }

        let required = |value: Option<String>, flag: &str| {
            value.ok_or_else(|| anyhow::anyhow!("--{flag} is required unless --spec is given"))
        };
        Ok(AccountSpec {
            name: required(self.name, "name")?,
            email: required(self.email, "email")?,
            organizational_unit: self.ou,
            organizational_unit_path: self.ou_path,
            provisioned_product_name: self.product_name,
            sso: SsoUser {
                first_name: required(self.sso_first_name, "sso-first-name")?,
                last_name: required(self.sso_last_name, "sso-last-name")?,
                email: required(self.sso_email, "sso-email")?,
            },
            close_on_deletion: false,
        })
    }
}

fn load_spec(path: &Path) -> anyhow::Result<AccountSpec> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_yaml::from_str(&data).with_context(|| format!("failed to parse {}", path.display()))
}

/// `--close` wins; otherwise the spec file decides.
fn close_on_deletion(close: bool, spec: Option<&Path>) -> anyhow::Result<bool> {
    match spec {
        Some(path) if !close => Ok(load_spec(path)?.close_on_deletion),
        _ => Ok(close),
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(config: &Path, subcmd: AccountSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        AccountSubcommand::Create(spec) => create(config, spec, json),
        AccountSubcommand::Read { id } => read(config, &id, json),
        AccountSubcommand::Update { id, spec } => update(config, &id, spec, json),
        AccountSubcommand::Delete { id, close, spec } => {
            let close = close_on_deletion(close, spec.as_deref())?;
            delete(config, &id, close, json)
        }
    }
}

fn create(config: &Path, args: SpecArgs, json: bool) -> anyhow::Result<()> {
    let spec = args.into_spec()?;
    let provider = super::provider(config)?;
    let outcome = super::block_on(provider.create(&spec))?;

    match outcome.result {
        Ok(record) => show(&record, json),
        Err(e) => {
            if let Some(id) = &outcome.identity {
                eprintln!(
                    "note: provisioned product {id} exists; read or delete it instead of creating again"
                );
            }
            Err(e).with_context(|| format!("failed to create account '{}'", spec.name))
        }
    }
}

fn read(config: &Path, id: &str, json: bool) -> anyhow::Result<()> {
    let provider = super::provider(config)?;
    let record = super::block_on(provider.read(id))?
        .with_context(|| format!("failed to read account {id}"))?;
    show(&record, json)
}

fn update(config: &Path, id: &str, args: SpecArgs, json: bool) -> anyhow::Result<()> {
    let spec = args.into_spec()?;
    let provider = super::provider(config)?;
    let record = super::block_on(provider.update(id, &spec))?
        .with_context(|| format!("failed to update account {id}"))?;
    show(&record, json)
}

fn delete(config: &Path, id: &str, close: bool, json: bool) -> anyhow::Result<()> {
    let provider = super::provider(config)?;
    let outcome = super::block_on(provider.delete(id, close))?
        .with_context(|| format!("failed to delete account {id}"))?;

    if json {
        return print_json(&outcome);
    }
    println!("Terminated {} (record {}).", outcome.provisioned_product_id, outcome.record_id);
    if let (Some(account), Some(status)) = (&outcome.closed_account_id, &outcome.final_status) {
        println!("Closed account {account}: {status}.");
    }
    Ok(())
}

fn show(record: &AccountRecord, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(record);
    }
    print_fields(&[
        ("provisioned product", Some(record.provisioned_product_id.as_str())),
        ("name", Some(record.provisioned_product_name.as_str())),
        ("last record", record.last_record_id.as_deref()),
        ("account id", record.account_id.as_deref()),
        ("account name", record.account_name.as_deref()),
        ("account email", record.account_email.as_deref()),
        ("status", record.account_status.as_deref()),
    ]);
    Ok(())
}
