use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use shadowfleet::common::config::AppCfg;

pub const HEADER: &str = "IMO,Name,Type,Flag,Built,GT,DWT,Size";

/// Three near-identical confirmed tankers.
pub const SHADOW_ROWS: &[&str] = &[
    "9100001,ALPHA,Tanker,Gabon,1995,58000,100000,250 / 44 m",
    "9100002,BRAVO,Tanker,Gabon,1996,57500,102000,249 / 44 m",
    "9100003,CHARLIE,Tanker,Gabon,1994,58200,99000,251 / 44 m",
];

/// Ten background vessels with mostly distinct flags and several gaps.
pub const UNKNOWN_ROWS: &[&str] = &[
    "9200001,DELTA,Cargo,Malta,2015,9000,12000,140 / 22 m",
    "9200002,ECHO,Container,Liberia,2018,40000,50000,300 / 48 m",
    "9200003,FOXTROT,Cargo,-,N/A,8000,,120 / 20 m",
    "9200004,GOLF,Bulk Carrier,Panama,2010,30000,55000,",
    "9200005,HOTEL,Tanker,Norway,2019,20000,35000,180 / 32 m",
    "9200006,INDIA,Cargo,Greece,,5000,7000,100 / 16 m",
    "9200007,JULIET,Container,Cyprus,2012,60000,,330 / 50 m",
    "9200008,KILO,Cargo,Denmark,2021,4000,6000,95 / 15 m",
    "9200009,LIMA,Bulk Carrier,Japan,2005,,40000,200 / 32 m",
    "9200010,MIKE,Tug,,2000,500,300,30 / 10 m",
];

pub fn write_csv(path: &Path, header: &str, rows: &[&str]) {
    let mut text = String::from(header);
    text.push('\n');
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    fs::write(path, text).unwrap();
}

/// Write both input files into `dir` and return a config pointing at them.
pub fn scenario_cfg(dir: &Path, extra: &[(&str, &str)]) -> AppCfg {
    let shadow = dir.join("shadow.csv");
    let unknown = dir.join("unknown.csv");
    write_csv(&shadow, HEADER, SHADOW_ROWS);
    write_csv(&unknown, HEADER, UNKNOWN_ROWS);
    cfg_with(dir, &shadow, &unknown, extra)
}

pub fn cfg_with(dir: &Path, shadow: &Path, unknown: &Path, extra: &[(&str, &str)]) -> AppCfg {
    let path = |p: PathBuf| p.to_string_lossy().into_owned();
    let mut map: HashMap<String, String> = HashMap::from([
        ("SHADOWFLEET_DATA_ROOT".to_string(), path(dir.join("data"))),
        ("SHADOWFLEET_SHADOW_FILE".to_string(), path(shadow.to_path_buf())),
        ("SHADOWFLEET_UNKNOWN_FILE".to_string(), path(unknown.to_path_buf())),
        ("SHADOWFLEET_OUTPUT_FILE".to_string(), path(dir.join("out").join("scored.csv"))),
        ("SHADOWFLEET_METRICS_FILE".to_string(), path(dir.join("out").join("metrics.json"))),
        ("SHADOWFLEET_IMPORTANCE_FILE".to_string(), path(dir.join("out").join("importance.csv"))),
        (
            "SHADOWFLEET_FEATURES".to_string(),
            "Type:categorical,Flag:categorical,Built:numeric,DWT:numeric,Length:numeric".to_string(),
        ),
        ("SHADOWFLEET_TREES".to_string(), "100".to_string()),
    ]);
    for (k, v) in extra {
        map.insert(k.to_string(), v.to_string());
    }
    AppCfg::from_lookup(|key| map.get(key).cloned()).unwrap()
}

/// `(IMO, probability)` pairs from a scored CSV.
pub fn read_scores(path: &Path) -> Vec<(String, f64)> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    let headers = reader.headers().unwrap().clone();
    let imo = headers.iter().position(|h| h == "IMO").unwrap();
    let prob = headers.iter().position(|h| h == "Shadow_Probability").unwrap();
    reader
        .records()
        .map(|r| {
            let r = r.unwrap();
            (r[imo].to_string(), r[prob].parse().unwrap())
        })
        .collect()
}
