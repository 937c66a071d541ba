use kline_application::config::Config;
use kline_domain::repositories::artifacts::ArtifactWriter;
use kline_domain::repositories::market_data::MarketDataRepository;
use kline_infrastructure::artifacts::FilesystemArtifactWriter;
use kline_infrastructure::market_data::CsvMarketDataRepository;

pub struct EngineDeps {
    pub market_data: Box<dyn MarketDataRepository>,
    pub artifacts: Box<dyn ArtifactWriter>,
}

pub fn build_engine_deps(config: &Config) -> EngineDeps {
    EngineDeps {
        market_data: build_market_data_repo(config),
        artifacts: Box::new(FilesystemArtifactWriter::new()),
    }
}

pub fn build_market_data_repo(config: &Config) -> Box<dyn MarketDataRepository> {
    Box::new(CsvMarketDataRepository::new().with_max_gap_days(config.max_gap_days()))
}
