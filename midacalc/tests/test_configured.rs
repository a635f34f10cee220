use figment::{
    providers::{Format, Toml},
    Figment,
};

use midacalc::{MidaCalc, OutputFormat, PeptideReport};

#[test_log::test]
#[test_log(default_log_filter = "debug")]
fn test_toml_configured() {
    let config = Figment::new().merge(Toml::string(
        r#"
sequences = ["AG", "LLK"]
mass_cutoff = 3
p_max = 0.02
p_steps = 4
format = "json"
excess = true
threads = 2
"#,
    ));
    let driver: MidaCalc = config.extract().unwrap();
    assert_eq!(driver.format, OutputFormat::Json);
    assert_eq!(driver.output_file.to_str(), Some("-"));

    let mut buffer = Vec::new();
    let n = driver.run_to(&mut buffer).unwrap();
    assert_eq!(n, 2);

    let reports: Vec<PeptideReport> = serde_json::from_slice(&buffer).unwrap();
    assert_eq!(reports[1].sequence, "LLK");
    assert_eq!(reports[1].p_values.len(), 4);
    assert_eq!(reports[1].p_values[0], 0.0);
    assert!((reports[1].p_values[3] - 0.02).abs() < 1e-15);
    for row in reports[0].distributions.iter() {
        assert_eq!(row.len(), 4);
        let head: f64 = row.iter().sum();
        assert!((head - 1.0).abs() < 1e-12);
    }
    assert_eq!(reports[1].excess.as_ref().map(|e| e.len()), Some(4));
}
