use crate::config::Config;
use crate::db::Store;
use crate::services::DueSummaryService;

pub async fn cmd_due_summary(config: &Config, json: bool) -> anyhow::Result<()> {
    let store = Store::new(&config.general.database_path).await?;
    let service = DueSummaryService::new(store, config.scheduler.timezone_offset_minutes);

    let summary = service.run().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{}", summary.render());
    }

    Ok(())
}
