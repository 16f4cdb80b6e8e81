/*
 * @Description  : Layer 模块 - 预训练层的参数容器
 *
 * Layer 只保存参数与配置，不参与计算；接入计算图时先成为适配节点，
 * 再经`refine`分解为原语节点与常量节点。
 */

mod lstm;

pub use lstm::LstmLayer;
