/// 工具模块
/// Utility modules
pub mod color;
pub mod imgproc;
