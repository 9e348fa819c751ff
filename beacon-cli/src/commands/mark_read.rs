use anyhow::Result;
use clap::Args;
use cli::{NotificationCache, ReadStateReconciler};
use uuid::Uuid;

use super::ConnectionArgs;

#[derive(Args, Debug)]
#[command(about = "Mark notifications as read")]
#[group(id = "target", required = true, multiple = false)]
pub struct MarkReadArgs {
    /// Notification to mark read; repeat for several
    #[arg(long = "id", value_name = "ID")]
    pub ids: Vec<Uuid>,

    /// Mark every notification read
    #[arg(long)]
    pub all: bool,
}

pub async fn handle_mark_read(connection: &ConnectionArgs, args: MarkReadArgs) -> Result<()> {
    let connection = connection.connect()?;
    let cache = NotificationCache::shared(connection.config.cache_capacity);
    let reconciler = ReadStateReconciler::new(connection.api, cache);

    let updated = if args.all {
        reconciler.mark_all_as_read().await?
    } else {
        reconciler.mark_as_read(&args.ids).await?
    };

    println!("{updated} notification(s) marked read");
    Ok(())
}
