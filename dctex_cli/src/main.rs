// Copyright (c) 2026 The dctex authors
//
// Permission is hereby granted, free of charge, to any person obtaining
// a copy of this software and associated documentation files (the
// "Software"), to	deal in the Software without restriction, including
// without limitation the rights to use, copy, modify, merge, publish,
// distribute, sublicense, and/or sell copies of the Software, and to
// permit persons to whom the Software is furnished to do so, subject to
// the following conditions:
//
// The above copyright notice and this permission notice shall be included
// in all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS
// OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF
// MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT.
// IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY
// CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT,
// TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE
// SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use std::error::Error;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use log::{debug, error, LevelFilter};

use dctex::{
    alpha, blue, green, red, Image, ImageSet, MipFilter, Palette, PixelFormat, Texture,
    TextureType,
};

mod image;

#[derive(Clone, Copy, ValueEnum)]
enum CliFormat {
    #[value(name = "ARGB1555")]
    Argb1555,
    #[value(name = "RGB565")]
    Rgb565,
    #[value(name = "ARGB4444")]
    Argb4444,
    #[value(name = "YUV422")]
    Yuv422,
    #[value(name = "BUMPMAP")]
    Bumpmap,
    #[value(name = "PAL4BPP")]
    Pal4bpp,
    #[value(name = "PAL8BPP")]
    Pal8bpp,
}

impl From<CliFormat> for PixelFormat {
    fn from(format: CliFormat) -> PixelFormat {
        match format {
            CliFormat::Argb1555 => PixelFormat::Argb1555,
            CliFormat::Rgb565 => PixelFormat::Rgb565,
            CliFormat::Argb4444 => PixelFormat::Argb4444,
            CliFormat::Yuv422 => PixelFormat::Yuv422,
            CliFormat::Bumpmap => PixelFormat::Bumpmap,
            CliFormat::Pal4bpp => PixelFormat::Pal4bpp,
            CliFormat::Pal8bpp => PixelFormat::Pal8bpp,
        }
    }
}

/// Converts images to the Dreamcast texture format.
/// Supports all formats that the PVR2 supports.
#[derive(Parser)]
#[command(name = "dctex", version, about)]
struct Opt {
    /// Input file(s)
    #[arg(short = 'i', long = "in", value_name = "FILE", required = true)]
    input: Vec<PathBuf>,

    /// Output file
    #[arg(short = 'o', long = "out", value_name = "FILE")]
    output: PathBuf,

    /// Texture format
    #[arg(short = 'f', long = "format", value_enum, ignore_case = true)]
    format: CliFormat,

    /// Generate/allow mipmaps
    #[arg(short = 'm', long)]
    mipmap: bool,

    /// Output a compressed texture
    #[arg(short = 'c', long)]
    compress: bool,

    /// Output a stride texture
    #[arg(short = 's', long)]
    stride: bool,

    /// Generate a texture preview
    #[arg(short = 'p', long, value_name = "FILE")]
    preview: Option<PathBuf>,

    /// Output an image that visualizes compression code usage
    #[arg(long = "vqcodeusage", value_name = "FILE")]
    vq_code_usage: Option<PathBuf>,

    /// Use nearest-neighbor filtering for scaling mipmaps
    #[arg(short = 'n', long)]
    nearest: bool,

    /// Use bilinear filtering for scaling mipmaps
    #[arg(short = 'b', long)]
    bilinear: bool,

    /// Extra printouts
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() {
    let opt = Opt::parse();

    env_logger::Builder::new()
        .filter_level(if opt.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Warn
        })
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(e) = run(&opt) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(opt: &Opt) -> Result<(), Box<dyn Error>> {
    let format: PixelFormat = opt.format.into();

    let mut ttype = TextureType::new(format);
    if opt.mipmap {
        ttype = ttype.with_mipmaps();
    }
    if opt.compress {
        ttype = ttype.with_compression();
    }
    if opt.stride {
        ttype = ttype.with_stride();
    }

    // Nearest-neighbor by default for paletted images to avoid
    // introducing more colors. It would make sense for lossless vq
    // textures as well, but whether the output ends up lossless isn't
    // known at this stage, so that's up to the user.
    let mut filter = if format.is_paletted() {
        MipFilter::Nearest
    } else {
        MipFilter::Bilinear
    };
    if opt.nearest {
        filter = MipFilter::Nearest;
    }
    if opt.bilinear {
        filter = MipFilter::Bilinear;
    }

    // Stride textures have a lot of restraints, and we need to check 'em all.
    if opt.stride {
        if opt.compress {
            return Err("stride textures can't be compressed".into());
        }
        if opt.mipmap {
            return Err("stride textures can't have mipmaps".into());
        }
        if format.is_paletted() || format == PixelFormat::Bumpmap {
            return Err("only RGB565, ARGB1555, ARGB4444 and YUV422 can be strided".into());
        }
    }

    // Time to load the image(s)
    let mut rasters = Vec::new();
    for path in &opt.input {
        let raw = image::load(path)
            .map_err(|e| format!("failed to load image {}: {}", path.display(), e))?;
        rasters.push(to_argb_image(&raw));
        debug!("loaded image {}", path.display());
    }

    let images = ImageSet::build(rasters, ttype, filter)?;

    // Now that the images are loaded and the width is known, the stride
    // setting can go in the low bits of the type word.
    if opt.stride {
        ttype = ttype.with_stride_setting(images.width());
    }

    let palette_path = {
        let mut name = opt.output.clone().into_os_string();
        name.push(".pal");
        PathBuf::from(name)
    };

    let out = File::create(&opt.output)
        .map_err(|e| format!("failed to open {}: {}", opt.output.display(), e))?;
    let mut stream = BufWriter::new(out);
    let palette = dctex::encode(&mut stream, &images, ttype)?;
    stream.flush()?;

    if let Some(palette) = &palette {
        let file = File::create(&palette_path)
            .map_err(|e| format!("failed to open {}: {}", palette_path.display(), e))?;
        let mut stream = BufWriter::new(file);
        palette.save(&mut stream)?;
        stream.flush()?;
        debug!("saved palette {}", palette_path.display());
    }

    debug!("saved texture {}", opt.output.display());

    // Generate preview and/or vq code usage images
    let code_usage = if ttype.compressed() {
        opt.vq_code_usage.as_deref()
    } else {
        None
    };
    if opt.preview.is_some() || code_usage.is_some() {
        generate_preview(
            &opt.output,
            &palette_path,
            opt.preview.as_deref(),
            code_usage,
        )?;
    }

    Ok(())
}

fn to_argb_image(raw: &image::RawImage) -> Image {
    let pixels = raw
        .data
        .chunks(4)
        .map(|rgba| dctex::argb(rgba[3], rgba[0], rgba[1], rgba[2]))
        .collect();
    Image::from_pixels(raw.width, raw.height, pixels)
}

/// Re-reads the texture just written and renders its mipmap levels (and
/// codebook usage, for compressed textures) into PNG strips.
fn generate_preview(
    texture_path: &Path,
    palette_path: &Path,
    preview: Option<&Path>,
    code_usage: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let mut reader = BufReader::new(File::open(texture_path)?);
    let texture = Texture::read(&mut reader)?;

    let palette = if texture.texture_type().is_paletted() {
        let mut reader = BufReader::new(File::open(palette_path)?);
        Some(Palette::load(&mut reader)?)
    } else {
        None
    };

    let decoded = texture.decode(palette.as_ref())?;

    if let Some(path) = preview {
        let strip = assemble_strip(&decoded.levels).ok_or("failed to generate preview")?;
        save_png(path, &strip)?;
        debug!("saved preview image {}", path.display());
    }

    if let Some(path) = code_usage {
        let strip = assemble_strip(&decoded.code_usage).ok_or("failed to generate code usage")?;
        save_png(path, &strip)?;
        debug!("saved code usage image {}", path.display());
    }

    Ok(())
}

/// Lays the levels (largest first) out on one canvas: the largest level
/// at the left, the smaller ones stacked in a column to its right.
fn assemble_strip(levels: &[Image]) -> Option<Image> {
    match levels {
        [] => None,
        [single] => Some(single.clone()),
        _ => {
            let width = levels[0].width();
            let height = levels[0].height();
            let mut canvas = Image::new(width + width / 2, height);

            let (mut ox, mut oy) = (0, 0);
            for level in levels {
                for y in 0..level.height() {
                    for x in 0..level.width() {
                        canvas.set_pixel(ox + x, oy + y, level.pixel(x, y));
                    }
                }
                if ox == 0 {
                    ox = level.width();
                } else {
                    oy += level.height();
                }
            }
            Some(canvas)
        }
    }
}

fn save_png(path: &Path, img: &Image) -> Result<(), Box<dyn Error>> {
    let mut data = Vec::with_capacity(img.width() * img.height() * 4);
    for &pixel in img.pixels() {
        data.extend_from_slice(&[red(pixel), green(pixel), blue(pixel), alpha(pixel)]);
    }
    image::png::write(path, img.width() as u32, img.height() as u32, &data)
}

#[test]
fn verify_cli() {
    use clap::CommandFactory;
    Opt::command().debug_assert();
}
