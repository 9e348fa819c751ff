use anyhow::Result;
use clap::Args;
use cli::NotificationApi;
use shared::models::Notification;

use super::ConnectionArgs;

#[derive(Args, Debug)]
#[command(about = "Show recent notifications and the unread count")]
pub struct ListArgs {
    /// Maximum number of notifications to show (server caps at 100)
    #[arg(long, default_value_t = 20)]
    pub limit: usize,

    /// Only show unread notifications
    #[arg(long)]
    pub unread_only: bool,
}

pub(crate) fn format_row(row: &Notification) -> String {
    let marker = if row.is_read { ' ' } else { '*' };
    format!(
        "{marker} {id}  {created}  [{kind}] {title}: {message}",
        id = row.id,
        created = row.created_at,
        kind = row.notification_type.as_str(),
        title = row.title,
        message = row.message,
    )
}

pub async fn handle_list(connection: &ConnectionArgs, args: ListArgs) -> Result<()> {
    let connection = connection.connect()?;
    let snapshot = connection.api.snapshot(args.limit, args.unread_only).await?;

    println!("{} unread", snapshot.unread_count);
    for row in &snapshot.data {
        println!("{}", format_row(row));
    }
    Ok(())
}
