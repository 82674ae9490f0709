use crate::error::Result;
use crate::settings::Config;
use crate::store::TransactionStore;

pub fn run(config: &Config) -> Result<()> {
    println!("Data dir:   {}", config.data_dir.display());
    println!("Store:      {}", config.store_path.display());
    println!("Ledger:     {}", config.ledger_path.display());
    println!("Maildir:    {}", config.maildir.display());
    println!("Logs:       {}", config.logs_dir.display());
    println!("Sender:     {}", config.sender);
    println!("Template:   {}", config.template);
    println!("Friend:     {}", config.split.friend_id);
    println!("Split:      {}", config.split.ratio);

    println!();
    if config.store_path.exists() {
        let store = TransactionStore::open(&config.store_path)?;
        println!("Processed:  {}", store.len());
    } else {
        println!("No transactions processed yet. Run `splitsync sync` to start.");
    }
    Ok(())
}
