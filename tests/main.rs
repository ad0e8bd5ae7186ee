#[cfg(test)]
mod tests {
    use std::fs;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use flate2::Compression;
    use imerge::png::chunk::{read_all, write_chunk, write_signature, ChunkType, RawChunk, IDAT, IEND, IHDR};
    use imerge::png::{build_scanlines, zlib};
    use imerge::{
        adler32, crc32, encode_rows, find_inputs, merge, merge_files, merge_streams, plan_batches, run_batches,
        ChecksumPolicy, ErrorKind, Image, ImageHeader, LoadOptions, MergeOptions, PixelRow, Rgb, IDAT_CHUNK_SIZE,
    };

    const RED: Rgb = Rgb::new(255, 0, 0);
    const BLUE: Rgb = Rgb::new(0, 0, 255);

    fn solid_rows(width: usize, height: usize, color: Rgb) -> Vec<PixelRow> {
        (0..height)
            .map(|_| (0..width).map(|_| color).collect::<PixelRow>())
            .collect()
    }

    // Every pixel differs, so misplaced rows or columns are detectable
    fn gradient_rows(width: usize, height: usize, seed: u8) -> Vec<PixelRow> {
        (0..height)
            .map(|y| {
                (0..width)
                    .map(|x| Rgb::new(x as u8, y as u8, seed.wrapping_add((x * 7 + y * 13) as u8)))
                    .collect::<PixelRow>()
            })
            .collect()
    }

    fn noise_rows(width: usize, height: usize) -> Vec<PixelRow> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        let mut next = move || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (state >> 33) as u8
        };

        (0..height)
            .map(|_| (0..width).map(|_| Rgb::new(next(), next(), next())).collect::<PixelRow>())
            .collect()
    }

    fn encode(rows: &[PixelRow]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut out = Vec::new();
        encode_rows(&ImageHeader::rgb8(1, 1), rows, &mut out, Compression::default())?;
        Ok(out)
    }

    fn load(bytes: &[u8]) -> Result<Image, Box<dyn std::error::Error>> {
        Ok(Image::load(Cursor::new(bytes))?)
    }

    fn build_file(chunks: &[(ChunkType, Vec<u8>)]) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
        let mut out = Vec::new();
        write_signature(&mut out)?;
        for (chunk_type, payload) in chunks {
            write_chunk(&mut out, *chunk_type, payload)?;
        }
        Ok(out)
    }

    fn temp_dir(name: &str) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dir = std::env::temp_dir().join(format!("imerge-{}-{}", name, std::process::id()));
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
        }
        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn write_png(path: &Path, rows: &[PixelRow]) -> Result<(), Box<dyn std::error::Error>> {
        fs::write(path, encode(rows)?)?;
        Ok(())
    }

    fn data_payloads(bytes: &[u8]) -> Result<Vec<Vec<u8>>, Box<dyn std::error::Error>> {
        Ok(read_all(Cursor::new(bytes))?
            .into_iter()
            .filter(|chunk| chunk.chunk_type == IDAT)
            .map(|chunk| chunk.data)
            .collect())
    }

    #[test]
    pub fn test_checksum_vectors() {
        assert_eq!(crc32(b""), 0);
        assert_eq!(crc32(b"123456789"), 0xCBF43926);
        assert_eq!(crc32(b"IEND"), 0xAE426082);

        assert_eq!(adler32(b""), 1);
        assert_eq!(adler32(b"Wikipedia"), 0x11E60398);
    }

    #[test]
    pub fn test_adler32_long_input() {
        // Long enough to cross several deferred-reduction blocks
        let data: Vec<u8> = (0..20_000u32).map(|i| 0xff - (i % 3) as u8).collect();

        let (mut a, mut b) = (1u32, 0u32);
        for &byte in &data {
            a = (a + byte as u32) % 65521;
            b = (b + a) % 65521;
        }

        assert_eq!(adler32(&data), (b << 16) | a);
    }

    #[test]
    pub fn test_chunk_framing() -> Result<(), Box<dyn std::error::Error>> {
        let text = ChunkType(*b"tEXt");
        let payload = b"Comment\0merged side by side".to_vec();
        let bytes = build_file(&[(text, payload.clone()), (IEND, Vec::new())])?;

        let chunks = read_all(Cursor::new(&bytes))?;
        assert_eq!(chunks.len(), 2);

        assert_eq!(chunks[0].chunk_type, text);
        assert_eq!(chunks[0].data, payload);
        let mut crc_domain = b"tEXt".to_vec();
        crc_domain.extend_from_slice(&payload);
        assert_eq!(chunks[0].crc, crc32(&crc_domain));
        assert!(chunks[0].crc_matches());
        assert_eq!(chunks[0], RawChunk::new(text, payload.clone()));

        // Length, type and CRC of an empty IEND chunk
        assert_eq!(
            &bytes[bytes.len() - 12..],
            &[0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]
        );

        Ok(())
    }

    #[test]
    pub fn test_zlib_framing() -> Result<(), Box<dyn std::error::Error>> {
        let raw = b"\0abcabcabcabcabcabc\0defdefdefdef".to_vec();
        let stream = zlib::deflate(&raw, Compression::default())?;

        assert_eq!(&stream[..2], &zlib::ZLIB_HEADER);
        assert_eq!(&stream[stream.len() - 4..], &adler32(&raw).to_be_bytes());

        let inflated = zlib::inflate(&stream)?;
        assert_eq!(inflated.data, raw);
        assert!(inflated.adler_matches());

        let err = zlib::inflate(&[0x78, 0x5e, 0xff, 0xff, 0xff, 0x00, 0, 0, 0, 1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        let err = zlib::inflate(&[0x78, 0x5e, 0, 0]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        Ok(())
    }

    #[test]
    pub fn test_round_trip() -> Result<(), Box<dyn std::error::Error>> {
        let rows = gradient_rows(5, 4, 42);
        let image = load(&encode(&rows)?)?;

        assert_eq!(image.width(), 5);
        assert_eq!(image.height(), 4);
        assert_eq!(image.pixel_size(), 3);

        // Each scanline is one filter byte followed by width * 3 pixel bytes
        let row_size = 1 + 5 * 3;
        assert_eq!(image.scanlines().len(), 4 * row_size);
        assert!(image.scanlines().chunks(row_size).all(|scanline| scanline[0] == 0));

        for (y, expected) in rows.iter().enumerate() {
            assert_eq!(&image.get_row(y as u32)?, expected);
        }

        Ok(())
    }

    #[test]
    pub fn test_merge_width_invariant() -> Result<(), Box<dyn std::error::Error>> {
        let images = [
            load(&encode(&gradient_rows(2, 5, 1))?)?,
            load(&encode(&gradient_rows(3, 5, 2))?)?,
            load(&encode(&gradient_rows(4, 5, 3))?)?,
        ];

        let mut out = Vec::new();
        let summary = merge(&images, &mut out)?;
        assert_eq!(summary.width, 9);
        assert_eq!(summary.height, 5);

        let merged = load(&out)?;
        assert_eq!(merged.width(), 9);
        assert_eq!(merged.height(), 5);
        assert_eq!(merged.header().bit_depth, images[0].header().bit_depth);
        assert_eq!(merged.header().color_type, images[0].header().color_type);

        Ok(())
    }

    #[test]
    pub fn test_merge_row_order() -> Result<(), Box<dyn std::error::Error>> {
        let a = load(&encode(&solid_rows(3, 2, RED))?)?;
        let b = load(&encode(&solid_rows(2, 2, BLUE))?)?;

        let mut out = Vec::new();
        merge(&[a, b], &mut out)?;
        let merged = load(&out)?;

        for y in 0..merged.height() {
            let row = merged.get_row(y)?;
            assert_eq!(row.width(), 5);
            assert!(row.pixels()[..3].iter().all(|p| *p == RED));
            assert!(row.pixels()[3..].iter().all(|p| *p == BLUE));
        }

        Ok(())
    }

    #[test]
    pub fn test_merge_preserves_pixels() -> Result<(), Box<dyn std::error::Error>> {
        let left = gradient_rows(4, 3, 10);
        let right = gradient_rows(6, 3, 200);
        let images = [load(&encode(&left)?)?, load(&encode(&right)?)?];

        let mut out = Vec::new();
        merge(&images, &mut out)?;
        let merged = load(&out)?;

        for y in 0..3 {
            let expected = PixelRow::concat([&left[y], &right[y]]);
            assert_eq!(merged.get_row(y as u32)?, expected);
        }

        Ok(())
    }

    #[test]
    pub fn test_data_chunk_splitting() -> Result<(), Box<dyn std::error::Error>> {
        let rows = noise_rows(64, 64);
        let image = load(&encode(&rows)?)?;

        let mut out = Vec::new();
        let summary = merge(&[image], &mut out)?;

        let payloads = data_payloads(&out)?;
        assert!(payloads.len() > 1);
        assert_eq!(payloads.len(), summary.data_chunks);
        assert!(payloads.iter().all(|p| p.len() <= IDAT_CHUNK_SIZE));
        assert!(payloads[..payloads.len() - 1].iter().all(|p| p.len() == IDAT_CHUNK_SIZE));

        let joined = payloads.concat();
        assert_eq!(joined.len(), summary.compressed_len);
        assert_eq!(joined, zlib::deflate(&build_scanlines(&rows), Compression::default())?);

        let merged = load(&out)?;
        for (y, expected) in rows.iter().enumerate() {
            assert_eq!(&merged.get_row(y as u32)?, expected);
        }

        Ok(())
    }

    #[test]
    pub fn test_output_chunk_layout() -> Result<(), Box<dyn std::error::Error>> {
        let text = ChunkType(*b"tEXt");
        let stream = zlib::deflate(&build_scanlines(&solid_rows(2, 2, RED)), Compression::default())?;
        let input = build_file(&[
            (IHDR, ImageHeader::rgb8(2, 2).to_bytes().to_vec()),
            (text, b"Title\0source".to_vec()),
            (IDAT, stream),
            (IEND, Vec::new()),
        ])?;

        let mut out = Vec::new();
        merge(&[load(&input)?], &mut out)?;

        let chunks = read_all(Cursor::new(&out))?;
        let types: Vec<ChunkType> = chunks.iter().map(|c| c.chunk_type).collect();
        assert_eq!(types, vec![IHDR, IDAT, IEND]);
        assert!(chunks.iter().all(|c| c.crc_matches()));

        Ok(())
    }

    #[test]
    pub fn test_invalid_signature() -> Result<(), Box<dyn std::error::Error>> {
        let mut bytes = encode(&solid_rows(2, 2, RED))?;
        bytes[1] = b'J';

        let err = Image::load(Cursor::new(&bytes)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);

        let err = Image::load(Cursor::new(&bytes[..3])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);

        let mut out = Vec::new();
        let err = merge_streams(vec![Cursor::new(&bytes)], &mut out, &MergeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidFormat);
        assert!(out.is_empty());

        Ok(())
    }

    #[test]
    pub fn test_header_must_be_first() -> Result<(), Box<dyn std::error::Error>> {
        let stream = zlib::deflate(&build_scanlines(&solid_rows(1, 1, RED)), Compression::default())?;
        let bytes = build_file(&[
            (ChunkType(*b"gAMA"), vec![0, 0, 0xb1, 0x8f]),
            (IHDR, ImageHeader::rgb8(1, 1).to_bytes().to_vec()),
            (IDAT, stream),
            (IEND, Vec::new()),
        ])?;
        assert_eq!(Image::load(Cursor::new(&bytes)).unwrap_err().kind(), ErrorKind::InvalidFormat);

        // Signature alone: no header at all
        let bytes = build_file(&[])?;
        assert_eq!(Image::load(Cursor::new(&bytes)).unwrap_err().kind(), ErrorKind::InvalidFormat);

        // Header with the wrong payload size
        let bytes = build_file(&[(IHDR, vec![0; 12])])?;
        assert_eq!(Image::load(Cursor::new(&bytes)).unwrap_err().kind(), ErrorKind::InvalidFormat);

        Ok(())
    }

    #[test]
    pub fn test_unsupported_formats() -> Result<(), Box<dyn std::error::Error>> {
        let stream = zlib::deflate(&[0, 0, 0, 0, 0, 0, 0], Compression::default())?;

        let rgba = ImageHeader { color_type: 6, ..ImageHeader::rgb8(1, 1) };
        let deep = ImageHeader { bit_depth: 16, ..ImageHeader::rgb8(1, 1) };
        let interlaced = ImageHeader { interlace_method: 1, ..ImageHeader::rgb8(1, 1) };

        for header in [rgba, deep, interlaced] {
            let bytes = build_file(&[
                (IHDR, header.to_bytes().to_vec()),
                (IDAT, stream.clone()),
                (IEND, Vec::new()),
            ])?;

            let err = Image::load(Cursor::new(&bytes)).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedFormat, "header {:?}", header);
        }

        Ok(())
    }

    #[test]
    pub fn test_filtered_rows_rejected() -> Result<(), Box<dyn std::error::Error>> {
        // Row 0 unfiltered, row 1 uses the Sub filter
        let raw = vec![0, 1, 2, 3, 4, 5, 6, 1, 1, 1, 1, 0, 0, 0];
        let bytes = build_file(&[
            (IHDR, ImageHeader::rgb8(2, 2).to_bytes().to_vec()),
            (IDAT, zlib::deflate(&raw, Compression::default())?),
            (IEND, Vec::new()),
        ])?;

        let image = load(&bytes)?;
        assert_eq!(
            image.get_row(0)?,
            PixelRow::from_rgb_bytes(&[1, 2, 3, 4, 5, 6])
        );
        assert_eq!(image.get_row(1).unwrap_err().kind(), ErrorKind::UnsupportedFormat);

        let mut out = Vec::new();
        assert_eq!(merge(&[image], &mut out).unwrap_err().kind(), ErrorKind::UnsupportedFormat);
        assert!(out.is_empty());

        Ok(())
    }

    #[test]
    pub fn test_row_out_of_range() -> Result<(), Box<dyn std::error::Error>> {
        let image = load(&encode(&solid_rows(2, 2, RED))?)?;

        assert_eq!(image.get_row(2).unwrap_err().kind(), ErrorKind::Precondition);

        Ok(())
    }

    #[test]
    pub fn test_truncated_input() -> Result<(), Box<dyn std::error::Error>> {
        let bytes = encode(&gradient_rows(4, 4, 0))?;

        for cut in [3, 8, 14] {
            let err = Image::load(Cursor::new(&bytes[..bytes.len() - cut])).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Decode, "cut {}", cut);
        }

        Ok(())
    }

    #[test]
    pub fn test_scanline_length_mismatch() -> Result<(), Box<dyn std::error::Error>> {
        let raw = build_scanlines(&solid_rows(2, 2, RED));
        let bytes = build_file(&[
            (IHDR, ImageHeader::rgb8(2, 3).to_bytes().to_vec()),
            (IDAT, zlib::deflate(&raw, Compression::default())?),
            (IEND, Vec::new()),
        ])?;

        assert_eq!(Image::load(Cursor::new(&bytes)).unwrap_err().kind(), ErrorKind::Decode);

        Ok(())
    }

    #[test]
    pub fn test_checksum_policy() -> Result<(), Box<dyn std::error::Error>> {
        let mut bytes = encode(&solid_rows(2, 2, BLUE))?;
        // First byte of the IHDR CRC: signature (8) + length (4) + type (4) + payload (13)
        bytes[29] ^= 0xff;

        let reject = LoadOptions::with_checksum_policy(ChecksumPolicy::Reject);
        let err = Image::load_with(Cursor::new(&bytes), reject).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);

        let warn = LoadOptions::with_checksum_policy(ChecksumPolicy::Warn);
        assert_eq!(Image::load_with(Cursor::new(&bytes), warn)?.width(), 2);

        let skip = LoadOptions::with_checksum_policy(ChecksumPolicy::Skip);
        assert_eq!(Image::load_with(Cursor::new(&bytes), skip)?.width(), 2);

        Ok(())
    }

    #[test]
    pub fn test_adler_mismatch_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let raw = build_scanlines(&solid_rows(2, 2, RED));
        let mut stream = zlib::deflate(&raw, Compression::default())?;
        let last = stream.len() - 1;
        stream[last] ^= 0x01;

        let bytes = build_file(&[
            (IHDR, ImageHeader::rgb8(2, 2).to_bytes().to_vec()),
            (IDAT, stream),
            (IEND, Vec::new()),
        ])?;

        let reject = LoadOptions::with_checksum_policy(ChecksumPolicy::Reject);
        assert_eq!(Image::load_with(Cursor::new(&bytes), reject).unwrap_err().kind(), ErrorKind::Decode);
        assert_eq!(load(&bytes)?.height(), 2);

        Ok(())
    }

    #[test]
    pub fn test_height_mismatch() -> Result<(), Box<dyn std::error::Error>> {
        let images = [
            load(&encode(&solid_rows(2, 2, RED))?)?,
            load(&encode(&solid_rows(2, 3, BLUE))?)?,
        ];

        let mut out = Vec::new();
        let err = merge(&images, &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(out.is_empty());

        let err = merge(&[], &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(out.is_empty());

        Ok(())
    }

    #[test]
    pub fn test_encode_rejects_ragged_rows() -> Result<(), Box<dyn std::error::Error>> {
        let mut rows = solid_rows(3, 2, RED);
        rows[1].push(BLUE);

        let mut out = Vec::new();
        let err = encode_rows(&ImageHeader::rgb8(3, 2), &rows, &mut out, Compression::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(out.is_empty());

        Ok(())
    }

    #[test]
    pub fn test_merge_files() -> Result<(), Box<dyn std::error::Error>> {
        let dir = temp_dir("merge-files")?;
        let a = dir.join("a.png");
        let b = dir.join("b.png");
        let tall = dir.join("tall.png");
        write_png(&a, &solid_rows(2, 3, RED))?;
        write_png(&b, &solid_rows(1, 3, BLUE))?;
        write_png(&tall, &solid_rows(1, 4, BLUE))?;

        let output = dir.join("out.png");
        let summary = merge_files(&[&a, &b], &output, &MergeOptions::default())?;
        assert_eq!((summary.width, summary.height), (3, 3));
        assert!(output.is_file());
        assert!(!dir.join("out.png.partial").exists());

        let merged = Image::load(fs::File::open(&output)?)?;
        assert_eq!(merged.get_row(2)?.pixels(), &[RED, RED, BLUE]);

        let failed = dir.join("failed.png");
        let err = merge_files(&[&a, &tall], &failed, &MergeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(!failed.exists());
        assert!(!dir.join("failed.png.partial").exists());

        let missing = merge_files(&[dir.join("missing.png")], &failed, &MergeOptions::default()).unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::Io);

        // A non-empty directory in the way makes the final rename fail
        let occupied = dir.join("occupied.png");
        fs::create_dir_all(occupied.join("inner"))?;
        let err = merge_files(&[&a, &b], &occupied, &MergeOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(occupied.join("inner").is_dir());
        assert!(!dir.join("occupied.png.partial").exists());

        fs::remove_dir_all(&dir)?;

        Ok(())
    }

    #[test]
    pub fn test_plan_batches() -> Result<(), Box<dyn std::error::Error>> {
        let files: Vec<PathBuf> = (0..7).map(|i| PathBuf::from(format!("in/{}.png", i))).collect();
        let batches = plan_batches(files.clone(), 3, Path::new("out"), 100001)?;

        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].inputs, files[0..3].to_vec());
        assert_eq!(batches[0].output, Path::new("out").join("100001.png"));
        assert_eq!(batches[1].inputs, files[3..6].to_vec());
        assert_eq!(batches[1].output, Path::new("out").join("100002.png"));

        let err = plan_batches(files, 0, Path::new("out"), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        Ok(())
    }

    #[test]
    pub fn test_run_batches() -> Result<(), Box<dyn std::error::Error>> {
        let dir = temp_dir("run-batches")?;
        let input_dir = dir.join("in");
        let output_dir = dir.join("out");
        fs::create_dir_all(&input_dir)?;
        fs::create_dir_all(&output_dir)?;

        write_png(&input_dir.join("01.png"), &solid_rows(2, 2, RED))?;
        write_png(&input_dir.join("02.png"), &solid_rows(2, 2, BLUE))?;
        write_png(&input_dir.join("03.png"), &solid_rows(1, 2, RED))?;
        fs::write(&input_dir.join("04.png"), b"not a png")?;
        fs::write(&input_dir.join("notes.txt"), b"ignored")?;

        let files = find_inputs(&input_dir)?;
        assert_eq!(files.len(), 4);
        assert!(files.windows(2).all(|w| w[0] < w[1]));

        let batches = plan_batches(files, 2, &output_dir, 100001)?;
        let report = run_batches(&batches, &MergeOptions::default(), false);

        assert_eq!(report.merged.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.skipped, 0);
        assert!(!report.is_success());
        assert_eq!(report.failures[0].error.kind(), ErrorKind::InvalidFormat);

        let merged = Image::load(fs::File::open(output_dir.join("100001.png"))?)?;
        assert_eq!(merged.width(), 4);
        assert!(!output_dir.join("100002.png").exists());

        let err = find_inputs(&dir.join("missing")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);

        fs::remove_dir_all(&dir)?;

        Ok(())
    }

    #[test]
    pub fn test_run_batches_fail_fast() -> Result<(), Box<dyn std::error::Error>> {
        let dir = temp_dir("fail-fast")?;
        let input_dir = dir.join("in");
        let output_dir = dir.join("out");
        fs::create_dir_all(&input_dir)?;
        fs::create_dir_all(&output_dir)?;

        fs::write(&input_dir.join("01.png"), b"not a png")?;
        write_png(&input_dir.join("02.png"), &solid_rows(2, 2, RED))?;
        write_png(&input_dir.join("03.png"), &solid_rows(2, 2, BLUE))?;

        let batches = plan_batches(find_inputs(&input_dir)?, 1, &output_dir, 100001)?;
        assert_eq!(batches.len(), 3);

        let report = run_batches(&batches, &MergeOptions::default(), true);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].output, output_dir.join("100001.png"));
        assert!(report.merged.is_empty());
        assert_eq!(report.skipped, 2);
        assert!(!output_dir.join("100002.png").exists());
        assert!(!output_dir.join("100003.png").exists());

        let report = run_batches(&batches, &MergeOptions::default(), false);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.merged.len(), 2);
        assert_eq!(report.skipped, 0);

        fs::remove_dir_all(&dir)?;

        Ok(())
    }
}
