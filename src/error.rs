use thiserror::Error;

/// 盤面描画で発生するエラー
#[derive(Error, Debug)]
pub enum RenderError {
    /// 局面文字列が不正（strict モードのみ）
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// 駒画像テーブルに存在しない駒コード
    #[error("unknown piece code: {code:?}")]
    UnknownPieceCode { code: String },

    #[error("failed to load sprite sheet {locator}: {source}")]
    Asset {
        locator: String,
        #[source]
        source: image::ImageError,
    },

    #[error("sprite sheet is {width}x{height}, expected at least {min_width}x{min_height}")]
    SheetTooSmall {
        width: u32,
        height: u32,
        min_width: u32,
        min_height: u32,
    },

    #[error("drawing backend error: {0}")]
    Drawing(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("kifu error: {0}")]
    Kifu(String),

    #[error("render worker panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, RenderError>;
