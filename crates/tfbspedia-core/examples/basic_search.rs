//! Basic usage example - search a data directory by factor name or region

use tfbspedia_core::{EvidenceType, PageWindow, Result, Species, TfbsApi};

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "./tfbspedia-data".to_string());
    let query = args.next().unwrap_or_else(|| "CTCF".to_string());
    let cell_tissue = args.next();

    println!("Initializing TfbsApi with path: {}", path);
    let api = TfbsApi::builder(&path).build()?;

    let page = api
        .search_query(
            Species::Human,
            &query,
            cell_tissue.as_deref(),
            EvidenceType::All,
            PageWindow::default(),
        )
        .await?;

    println!("{} matching records, first {}:", page.total, page.records.len());
    for record in page.records {
        println!(
            "  {}\t{}:{}-{}",
            record.id, record.chromosome, record.start, record.end
        );
    }

    Ok(())
}
