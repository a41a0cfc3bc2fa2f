#![no_main]

use libfuzzer_sys::fuzz_target;
use photonfile::PhotonFile;

fuzz_target!(|data: &[u8]| {
    if let Ok(photon) = PhotonFile::from_mem(data.to_vec()) {
        for index in 0..photon.layer_count().min(4) {
            let _ = photon.export_layer(index);
        }
        let _ = photon.to_bytes();
    }
});
