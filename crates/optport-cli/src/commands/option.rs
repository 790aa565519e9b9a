use clap::Subcommand;
use optport_core::storage::{is_transient, SettingsStore};
use optport_core::SettingValue;

use super::{CliResult, Context};

#[derive(Subcommand)]
pub enum OptionAction {
    /// List option names in store order
    List {
        /// Include transient cache entries
        #[arg(long)]
        all: bool,
        #[arg(long)]
        json: bool,
    },
    /// Print an option's value
    Get {
        name: String,
        /// Print as JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
    /// Set an option's value
    Set {
        name: String,
        value: String,
        /// Parse the value as JSON (arrays become lists, objects maps)
        #[arg(long)]
        json: bool,
        /// Store a new option with autoload disabled
        #[arg(long)]
        no_autoload: bool,
    },
    /// Delete an option
    Delete { name: String },
}

pub fn run(ctx: &Context, action: OptionAction) -> CliResult {
    let config = ctx.load_config()?;
    let mut store = ctx.open_store(&config)?;

    match action {
        OptionAction::List { all, json } => {
            let names: Vec<String> = store
                .names()?
                .into_iter()
                .filter(|n| all || !is_transient(n))
                .collect();
            if json {
                let rows = names
                    .iter()
                    .map(|n| {
                        Ok(serde_json::json!({
                            "name": n,
                            "autoload": store.autoload(n)?.unwrap_or(true),
                        }))
                    })
                    .collect::<Result<Vec<_>, optport_core::StoreError>>()?;
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for name in names {
                    println!("{name}");
                }
            }
        }
        OptionAction::Get { name, json } => match store.get(&name)? {
            Some(value) if json => {
                println!("{}", serde_json::to_string_pretty(&value.to_plain_json())?)
            }
            Some(value) => println!("{value}"),
            None => return Err(format!("option not found: {name}").into()),
        },
        OptionAction::Set {
            name,
            value,
            json,
            no_autoload,
        } => {
            let value = if json {
                SettingValue::from_plain_json(serde_json::from_str(&value)?)
            } else {
                SettingValue::Str(value)
            };
            if store.contains(&name)? {
                if no_autoload {
                    store.delete(&name)?;
                    store.add(&name, &value, false)?;
                } else {
                    store.update(&name, &value)?;
                }
            } else {
                store.add(&name, &value, !no_autoload)?;
            }
            tracing::info!(option = %name, "option set");
            println!("ok");
        }
        OptionAction::Delete { name } => {
            if store.delete(&name)? {
                println!("deleted {name}");
            } else {
                return Err(format!("option not found: {name}").into());
            }
        }
    }
    Ok(())
}
