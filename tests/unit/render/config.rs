use super::*;

#[test]
fn defaults_match_documented_values() {
    let cfg = RenderConfig::default();
    assert_eq!(cfg.codec, Codec::H264);
    assert_eq!(cfg.crf, 18);
    assert_eq!(cfg.pixel_format, "yuv420p");
    assert_eq!(cfg.concurrency, 4);
    assert_eq!(cfg.container, Container::Mp4);
    assert!(cfg.validate().is_ok());
}

#[test]
fn nonsense_is_rejected() {
    let cases = [
        RenderConfig {
            crf: 52,
            ..RenderConfig::default()
        },
        RenderConfig {
            concurrency: 0,
            ..RenderConfig::default()
        },
        RenderConfig {
            pixel_format: String::new(),
            ..RenderConfig::default()
        },
        RenderConfig {
            codec: Codec::Vp9,
            ..RenderConfig::default()
        },
    ];
    for cfg in cases {
        assert!(matches!(cfg.validate(), Err(StillmotionError::Config(_))), "{cfg:?}");
    }
}

#[test]
fn codec_container_pairs() {
    assert!(Codec::Vp9.fits(Container::Webm));
    assert!(Codec::H265.fits(Container::Mov));
    assert!(Codec::ProRes.fits(Container::Mov));
    assert!(!Codec::ProRes.fits(Container::Mp4));
    assert!(!Codec::H264.fits(Container::Webm));
}

#[test]
fn names_parse_leniently() {
    assert_eq!("HEVC".parse::<Codec>().unwrap(), Codec::H265);
    assert_eq!(" vp8 ".parse::<Codec>().unwrap(), Codec::Vp8);
    assert_eq!(".webm".parse::<Container>().unwrap(), Container::Webm);
    assert!("mpeg2".parse::<Codec>().is_err());
    assert!("avi".parse::<Container>().is_err());
    assert_eq!(Codec::ProRes.to_string(), "prores");
    assert_eq!(Container::Mov.extension(), "mov");
}
