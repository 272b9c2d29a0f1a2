#[cfg(test)]
mod tests {
    use crate::config::{AnalysisDepth, Conference, Config, OutputFormat};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert_eq!(config.output_path, PathBuf::from("./securipaper.out"));
        assert_eq!(config.internal_path, PathBuf::from("./.securipaper"));
        assert_eq!(config.output_format, OutputFormat::Markdown);
        assert_eq!(config.analysis.depth, AnalysisDepth::Detailed);
        assert!(!config.analysis.parallel);
        assert_eq!(config.analysis.max_concurrent_downloads, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert!(config.cache.enabled);
        assert!(!config.verbose);
    }

    #[test]
    fn test_conference_from_str() {
        assert_eq!("ccs".parse::<Conference>().unwrap(), Conference::Ccs);
        assert_eq!("SP".parse::<Conference>().unwrap(), Conference::Sp);
        assert_eq!("ndss".parse::<Conference>().unwrap(), Conference::Ndss);
        assert_eq!("usenix".parse::<Conference>().unwrap(), Conference::Usenix);
        assert!("pets".parse::<Conference>().is_err());
    }

    #[test]
    fn test_conference_display_round_trip() {
        for conference in [
            Conference::Ccs,
            Conference::Sp,
            Conference::Ndss,
            Conference::Usenix,
        ] {
            let parsed: Conference = conference.to_string().parse().unwrap();
            assert_eq!(parsed, conference);
        }
    }

    #[test]
    fn test_analysis_depth_from_str() {
        assert_eq!(
            "basic".parse::<AnalysisDepth>().unwrap(),
            AnalysisDepth::Basic
        );
        assert_eq!(
            "detailed".parse::<AnalysisDepth>().unwrap(),
            AnalysisDepth::Detailed
        );
        assert_eq!(
            "comprehensive".parse::<AnalysisDepth>().unwrap(),
            AnalysisDepth::Comprehensive
        );
        assert!("ultra".parse::<AnalysisDepth>().is_err());
    }

    #[test]
    fn test_output_format_extension() {
        assert_eq!(OutputFormat::Markdown.extension(), "md");
        assert_eq!(OutputFormat::Html.extension(), "html");
        assert_eq!(OutputFormat::Pdf.extension(), "pdf");
    }

    #[test]
    fn test_output_format_from_str_aliases() {
        assert_eq!(
            "md".parse::<OutputFormat>().unwrap(),
            OutputFormat::Markdown
        );
        assert_eq!("HTML".parse::<OutputFormat>().unwrap(), OutputFormat::Html);
    }

    #[test]
    fn test_config_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("securipaper.toml");
        let default_toml = toml::to_string(&Config::default()).unwrap();
        fs::write(&config_path, default_toml).unwrap();

        let config = Config::from_file(&config_path).unwrap();
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.analysis.max_concurrent_downloads, 5);
    }

    #[test]
    fn test_config_from_missing_file_fails() {
        let path = PathBuf::from("/nonexistent/securipaper.toml");
        assert!(Config::from_file(&path).is_err());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = Config::default();
        let serialized = toml::to_string(&config).unwrap();
        let restored: Config = toml::from_str(&serialized).unwrap();

        assert_eq!(restored.output_format, config.output_format);
        assert_eq!(restored.analysis.depth, config.analysis.depth);
        assert_eq!(restored.research.acm_base_url, config.research.acm_base_url);
    }
}
