#[cfg(test)]
mod tests {
    use crate::cli::Args;
    use crate::config::{AnalysisDepth, OutputFormat};
    use std::path::PathBuf;

    fn base_args() -> Args {
        Args {
            conference: Some("ccs".to_string()),
            year: Some("2024".to_string()),
            config: None,
            output_dir: None,
            depth: "detailed".to_string(),
            parallel: false,
            format: "markdown".to_string(),
            debug: false,
            clean_cache: false,
            serve: false,
            port: None,
        }
    }

    #[test]
    fn test_into_config_defaults() {
        let config = base_args().into_config().unwrap();

        assert_eq!(config.analysis.depth, AnalysisDepth::Detailed);
        assert_eq!(config.output_format, OutputFormat::Markdown);
        assert!(!config.analysis.parallel);
        assert!(!config.verbose);
    }

    #[test]
    fn test_into_config_overrides() {
        let mut args = base_args();
        args.output_dir = Some(PathBuf::from("/tmp/out"));
        args.depth = "comprehensive".to_string();
        args.format = "html".to_string();
        args.parallel = true;
        args.debug = true;
        args.port = Some(9000);

        let config = args.into_config().unwrap();
        assert_eq!(config.output_path, PathBuf::from("/tmp/out"));
        assert_eq!(config.analysis.depth, AnalysisDepth::Comprehensive);
        assert_eq!(config.output_format, OutputFormat::Html);
        assert!(config.analysis.parallel);
        assert!(config.verbose);
        assert_eq!(config.server.port, 9000);
    }

    #[test]
    fn test_into_config_unknown_depth_falls_back() {
        let mut args = base_args();
        args.depth = "extreme".to_string();
        args.format = "docx".to_string();

        let config = args.into_config().unwrap();
        assert_eq!(config.analysis.depth, AnalysisDepth::Detailed);
        assert_eq!(config.output_format, OutputFormat::Markdown);
    }

    #[test]
    fn test_into_config_missing_config_file_is_error() {
        let mut args = base_args();
        args.config = Some(PathBuf::from("/nonexistent/securipaper.toml"));

        assert!(args.into_config().is_err());
    }
}
