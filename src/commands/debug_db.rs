use std::path::Path;

use crate::instruments::InstrumentDb;
use crate::positions::{load_positions, normalize_positions};

/// Prints what the instrument DB and positions look like after loading and
/// which of the first few positions match. Problems are printed, not returned.
pub fn debug_db(data_dir: &Path, instruments_path: &Path, positions_path: &Path) {
    println!("data_dir: {:?}", data_dir);
    println!("db_path: {:?}", instruments_path);
    println!("db_exists: {}", instruments_path.exists());

    let db = if instruments_path.exists() {
        match InstrumentDb::load(instruments_path) {
            Ok(db) => {
                println!("db_count: {}", db.count());
                let sample: Vec<String> = db.sample_isins(5).iter().map(|i| i.to_string()).collect();
                println!("db_isin_sample: {:?}", sample);
                Some(db)
            }
            Err(e) => {
                println!("db_load_error: {}", e);
                None
            }
        }
    } else {
        None
    };

    println!("positions_path: {:?}", positions_path);
    println!("positions_exists: {}", positions_path.exists());
    if !positions_path.exists() {
        return;
    }

    match load_positions(positions_path).and_then(|raw| normalize_positions(&raw)) {
        Ok(holdings) => {
            for h in holdings.iter().take(5) {
                let matched = db.as_ref().map(|db| db.is_exit_tax(&h.isin)).unwrap_or(false);
                println!("position {} exit_tax={}", h.isin, matched);
            }
        }
        Err(e) => println!("positions_error: {}", e),
    }
}
