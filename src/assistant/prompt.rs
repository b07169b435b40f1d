//! System instruction for the travel guide persona.

use crate::config::ReplyConfig;

/// City assumed when the user names no location.
pub const DEFAULT_CITY: &str = "Thành phố Hồ Chí Minh";

/// Build the system instruction, embedding the reply policy so the provider
/// is asked for exactly what the validator will keep.
#[must_use]
pub fn system_prompt(default_city: &str, policy: &ReplyConfig) -> String {
    let mut prompt = String::with_capacity(1024);

    prompt.push_str("Bạn là chuyên gia du lịch và văn hóa Việt Nam.\n\n");
    prompt.push_str("QUY TẮC:\n");
    prompt.push_str(&format!(
        "- Nếu người dùng không nói địa điểm thì mặc định là {default_city}\n"
    ));
    prompt.push_str("- Chỉ trả lời các chủ đề: du lịch, địa điểm, văn hóa, lịch sử, ẩm thực\n");
    prompt.push_str("- Văn phong rõ ràng, súc tích, có chiều sâu\n");
    prompt.push_str("- Không bịa dữ liệu\n\n");

    prompt.push_str("NỘI DUNG \"text\" gồm các phần:\n");
    prompt.push_str("📍 Giới thiệu\n🏛 Lịch sử – Văn hóa\n🍜 Ẩm thực\n🗺 Gợi ý tham quan\n\n");

    prompt.push_str("ĐỊNH DẠNG: chỉ trả về một đối tượng JSON duy nhất với các trường:\n");
    prompt.push_str("- \"text\": câu trả lời\n");
    prompt.push_str(&format!(
        "- \"images\": tối đa {} ảnh dạng {{\"url\", \"caption\"}}, URL https chỉ từ: {}\n",
        policy.max_images,
        policy.allowed_image_hosts.join(", ")
    ));
    prompt.push_str(&format!(
        "- \"video_links\": tối đa {} liên kết YouTube\n",
        policy.max_videos
    ));
    prompt.push_str(&format!(
        "- \"suggestions\": tối đa {} câu hỏi gợi ý tiếp theo\n",
        policy.max_suggestions
    ));
    prompt.push_str("Không dùng Markdown bao quanh JSON.");

    prompt
}
