//! The `groups` command.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use groupgraph_api::GroupMeClient;
use groupgraph_core::model::Group;
use groupgraph_core::{GgResult, GroupSource, Settings};

use crate::output::print_groups_table;

#[derive(Args)]
pub struct GroupsArgs {
    /// List groups you have left instead of active ones
    #[arg(long)]
    pub former: bool,

    /// Page of groups to show
    #[arg(long, default_value_t = 1)]
    pub page: u32,

    /// Groups per page
    #[arg(long, default_value_t = 10)]
    pub per_page: u32,
}

pub async fn execute(args: GroupsArgs, settings_path: &Path) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    let api = GroupMeClient::new(&settings)?;

    let groups = if args.former {
        api.groups_former().await.context("Failed to list former groups")?
    } else {
        active_groups(&api, &args).await.context("Failed to list groups")?
    };

    print_groups_table(&groups);
    Ok(())
}

/// One page of active groups, rosters included for the Members column.
async fn active_groups(source: &dyn GroupSource, args: &GroupsArgs) -> GgResult<Vec<Group>> {
    source.groups(args.page, args.per_page, false).await
}
