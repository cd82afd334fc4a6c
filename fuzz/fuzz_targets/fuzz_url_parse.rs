#![no_main]

use libfuzzer_sys::fuzz_target;
use reql_wire::config::UrlInfo;
use reql_wire::ConnectParams;

fuzz_target!(|data: &[u8]| {
    let Ok(url) = std::str::from_utf8(data) else {
        return;
    };

    let _ = UrlInfo::parse(url);

    // Whatever resolves must resolve to itself again
    if let Ok(config) = ConnectParams::new().url(url).resolve() {
        assert_eq!(config.to_params().resolve().as_ref(), Ok(&config));
    }
});
