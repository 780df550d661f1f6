#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = try_decode(data);
});

fn try_decode(data: &[u8]) -> Result<(), gifview::DecodingError> {
    let mut options = gifview::DecodeOptions::new();
    options.allow_other_extensions(true);
    options.check_lzw_end_code(false);
    let mut decoder = options.read_info(data)?;

    while let Some(frame) = decoder.read_next_frame()? {
        decoder.render(&frame)?;
    }

    Ok(())
}
